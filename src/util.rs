use std::iter::repeat;
use std::path::{Path, PathBuf};

pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(it))
}

/// Serializes optional ObjectIds as plain hex strings for JSON responses.
pub mod object_id_hex {
    use bson::oid::ObjectId;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(id: &Option<ObjectId>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.serialize_str(&id.to_hex()),
            None => serializer.serialize_none(),
        }
    }
}

/// Numeric fields written by other clients come back as Int32, Int64, Double or even
/// strings. These read whatever is stored and fall back to zero (or `None`) otherwise.
pub mod lenient {
    use bson::Bson;
    use serde::{Deserialize, Deserializer};

    fn to_i64(value: Bson) -> Option<i64> {
        match value {
            Bson::Int32(v) => Some(v as i64),
            Bson::Int64(v) => Some(v),
            Bson::Double(v) if v.is_finite() => Some(v as i64),
            Bson::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_f64(value: Bson) -> Option<f64> {
        match value {
            Bson::Int32(v) => Some(v as f64),
            Bson::Int64(v) => Some(v as f64),
            Bson::Double(v) => Some(v),
            Bson::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Ok(Option::<Bson>::deserialize(deserializer)?
            .and_then(to_i64)
            .unwrap_or_default())
    }

    pub fn option_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(Option::<Bson>::deserialize(deserializer)?.and_then(to_i64))
    }

    pub fn f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<Bson>::deserialize(deserializer)?
            .and_then(to_f64)
            .unwrap_or_default())
    }

    pub fn option_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<Bson>::deserialize(deserializer)?.and_then(to_f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Counters {
        #[serde(default, deserialize_with = "lenient::i64")]
        seats: i64,
        #[serde(default, deserialize_with = "lenient::option_f64")]
        price: Option<f64>,
    }

    #[test]
    fn numbers_are_read_whatever_their_stored_type() {
        let read = |document| bson::from_document::<Counters>(document).unwrap();

        let c = read(doc! { "seats": 5.0, "price": 30 });
        assert_eq!((c.seats, c.price), (5, Some(30.0)));

        let c = read(doc! { "seats": 7_i64, "price": "12.5" });
        assert_eq!((c.seats, c.price), (7, Some(12.5)));

        let c = read(doc! { "seats": "many", "price": bson::Bson::Null });
        assert_eq!((c.seats, c.price), (0, None));

        let c = read(doc! {});
        assert_eq!((c.seats, c.price), (0, None));
    }

    #[test]
    fn first_existing_subpath_is_returned() {
        let found = find_first_subpath("/root", &["a.yml", "b.yml"], |p| p.ends_with("b.yml"));
        assert_eq!(found, Some(PathBuf::from("/root/b.yml")));

        let missing = find_first_subpath("/root", &["a.yml"], |_| false);
        assert!(missing.is_none());
    }
}
