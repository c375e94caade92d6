use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use vfs::{Error, Result};

use crate::ByteStore;

/// A fixed-size little-endian on-disk record.
///
/// `SIZE` must equal the encoded length; [`write_record`] verifies it.
pub trait Record: for<'a> BinRead<Args<'a> = ()> + for<'a> BinWrite<Args<'a> = ()> {
    const SIZE: usize;
}

/// Decodes one record located at `offset`.
pub fn read_record<R: Record>(store: &dyn ByteStore, offset: u64) -> Result<R> {
    let mut buf = vec![0; R::SIZE];
    store.read_at(offset, &mut buf)?;
    R::read_le(&mut Cursor::new(buf)).map_err(codec_error)
}

/// Encodes `record` at `offset`, refusing to cross `bound`.
pub fn write_record<R: Record>(store: &dyn ByteStore, offset: u64, bound: u64, record: &R) -> Result<()> {
    if offset + R::SIZE as u64 > bound {
        return Err(Error::OutOfBounds { offset, bound });
    }

    let mut cursor = Cursor::new(Vec::with_capacity(R::SIZE));
    record.write_le(&mut cursor).map_err(codec_error)?;
    let buf = cursor.into_inner();
    if buf.len() != R::SIZE {
        return Err(Error::Corrupt(format!(
            "encoded {} bytes for a {}-byte record",
            buf.len(),
            R::SIZE
        )));
    }

    store.write_at(offset, &buf)?;
    Ok(())
}

fn codec_error(err: binrw::Error) -> Error {
    match err {
        binrw::Error::Io(err) => Error::IoFailure(err),
        other => Error::Corrupt(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use binrw::binrw;

    use super::*;
    use crate::MemStore;

    #[binrw]
    #[brw(little)]
    #[derive(Debug, PartialEq)]
    struct Pair {
        a: i32,
        b: i64,
    }

    impl Record for Pair {
        const SIZE: usize = 12;
    }

    #[test]
    fn record_at_offset() {
        let store = MemStore::new(32);
        let pair = Pair { a: -1, b: 0x0102 };
        write_record(&store, 4, 32, &pair).unwrap();

        assert_eq!(read_record::<Pair>(&store, 4).unwrap(), pair);
        assert_eq!(&store.snapshot()[4..8], &[0xFF; 4]);
        assert_eq!(store.snapshot()[8], 0x02);
    }

    #[test]
    fn bound_is_respected() {
        let store = MemStore::new(32);
        let pair = Pair { a: 1, b: 2 };
        assert!(matches!(
            write_record(&store, 10, 20, &pair),
            Err(Error::OutOfBounds { offset: 10, bound: 20 })
        ));
        assert!(store.snapshot().iter().all(|&b| b == 0));
    }
}
