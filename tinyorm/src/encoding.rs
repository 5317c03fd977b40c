use bincode::Options;

use crate::DbResult;

/// Big endian fixint so encoded ids sort the same way as the integers.
fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

pub(crate) fn encode<S: ?Sized + serde::Serialize>(item: &S) -> DbResult<Vec<u8>> {
    Ok(options().serialize(item)?)
}

pub(crate) fn decode<'a, T: serde::Deserialize<'a>>(bytes: &'a [u8]) -> DbResult<T> {
    Ok(options().deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_ids_keep_numeric_order() {
        let small = encode(&2i64).unwrap();
        let large = encode(&300i64).unwrap();

        assert!(small < large);
        assert_eq!(decode::<i64>(&large).unwrap(), 300);
    }
}
