use bytes::{Buf, BufMut};
use tabrec_error::{TabrecResult, tabrec_bail, tabrec_err};

/// Number of bytes used by the element count that precedes every encoded array.
pub const LENGTH_PREFIX_SIZE: usize = size_of::<u32>();

/// An element type with a fixed-width big-endian encoding.
pub trait FixedWidth: Copy + Sized {
    /// Encoded width of a single element, in bytes.
    const WIDTH: usize;

    /// Append the encoding of `self` to `buf`.
    fn put<B: BufMut>(self, buf: &mut B);

    /// Consume one element from `buf`. The caller guarantees `WIDTH` bytes remain.
    fn get<B: Buf>(buf: &mut B) -> Self;
}

macro_rules! fixed_width_int {
    ($T:ty, $put:ident, $get:ident) => {
        impl FixedWidth for $T {
            const WIDTH: usize = size_of::<$T>();

            #[inline]
            fn put<B: BufMut>(self, buf: &mut B) {
                buf.$put(self)
            }

            #[inline]
            fn get<B: Buf>(buf: &mut B) -> Self {
                buf.$get()
            }
        }
    };
}

fixed_width_int!(i32, put_i32, get_i32);
fixed_width_int!(u32, put_u32, get_u32);
fixed_width_int!(i64, put_i64, get_i64);
fixed_width_int!(u64, put_u64, get_u64);

/// Booleans take one whole byte each: `0` is false, anything else is true. `true` is always
/// written as `1`.
impl FixedWidth for bool {
    const WIDTH: usize = 1;

    #[inline]
    fn put<B: BufMut>(self, buf: &mut B) {
        buf.put_u8(u8::from(self))
    }

    #[inline]
    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_u8() != 0
    }
}

/// The number of bytes [`write_array`] produces for `len` elements of `T`.
pub fn encoded_len<T: FixedWidth>(len: usize) -> usize {
    LENGTH_PREFIX_SIZE + len * T::WIDTH
}

/// Write `values` as `[u32 count][element 0][element 1]...`, advancing the buffer.
///
/// Nothing is written if the buffer cannot hold the whole array.
pub fn write_array<T: FixedWidth, B: BufMut>(values: &[T], buf: &mut B) -> TabrecResult<()> {
    let count = u32::try_from(values.len())
        .map_err(|_| tabrec_err!("array of {} elements is too long to encode", values.len()))?;

    let needed = encoded_len::<T>(values.len());
    if buf.remaining_mut() < needed {
        tabrec_bail!(
            "buffer has {} bytes remaining but the array needs {needed}",
            buf.remaining_mut()
        );
    }

    buf.put_u32(count);
    for value in values {
        value.put(buf);
    }
    Ok(())
}

/// Read an array written by [`write_array`], advancing the buffer past it.
pub fn read_array<T: FixedWidth, B: Buf>(buf: &mut B) -> TabrecResult<Vec<T>> {
    if buf.remaining() < LENGTH_PREFIX_SIZE {
        tabrec_bail!(
            InvalidSerde: "buffer has {} bytes remaining, too few for an array length prefix",
            buf.remaining()
        );
    }

    let count = usize::try_from(buf.get_u32())
        .map_err(|_| tabrec_err!(InvalidSerde: "array length does not fit into a usize"))?;
    let needed = count
        .checked_mul(T::WIDTH)
        .ok_or_else(|| tabrec_err!(InvalidSerde: "array of {count} elements overflows usize"))?;
    if buf.remaining() < needed {
        tabrec_bail!(
            InvalidSerde: "array of {count} elements needs {needed} bytes but only {} remain",
            buf.remaining()
        );
    }

    Ok((0..count).map(|_| T::get(buf)).collect())
}

/// Write an array of `i32`.
pub fn write_int_array<B: BufMut>(values: &[i32], buf: &mut B) -> TabrecResult<()> {
    write_array(values, buf)
}

/// Read an array of `i32`.
pub fn read_int_array<B: Buf>(buf: &mut B) -> TabrecResult<Vec<i32>> {
    read_array(buf)
}

/// Write an array of booleans, one byte per element.
pub fn write_bool_array<B: BufMut>(values: &[bool], buf: &mut B) -> TabrecResult<()> {
    write_array(values, buf)
}

/// Read an array of booleans.
pub fn read_bool_array<B: Buf>(buf: &mut B) -> TabrecResult<Vec<bool>> {
    read_array(buf)
}

#[cfg(test)]
mod test {
    use bytes::{Buf, BufMut, BytesMut};
    use rstest::rstest;
    use tabrec_error::TabrecError;

    use super::*;

    #[test]
    fn int_array() {
        let mut buffer = BytesMut::with_capacity(10000);
        write_int_array(&[1, 2, 3], &mut buffer).unwrap();

        let bytes = buffer.freeze().to_vec();
        let y = read_int_array(&mut bytes.as_slice()).unwrap();
        assert_eq!(y, vec![1, 2, 3]);
        assert_eq!(y[2], 3);
    }

    #[test]
    fn bool_array() {
        let mut buffer = BytesMut::new();
        write_bool_array(&[true, false, true], &mut buffer).unwrap();
        assert_eq!(buffer.as_ref(), &[0, 0, 0, 3, 1, 0, 1]);

        let y = read_bool_array(&mut buffer.freeze()).unwrap();
        assert!(y[2]);
        assert!(!y[1]);
    }

    #[test]
    fn nonzero_bytes_are_true() {
        let bytes = [0u8, 0, 0, 2, 0x7f, 0];
        assert_eq!(read_bool_array(&mut bytes.as_slice()).unwrap(), vec![true, false]);
    }

    #[test]
    fn empty_array() {
        let mut buffer = Vec::<u8>::new();
        write_array::<i64, _>(&[], &mut buffer).unwrap();
        assert_eq!(buffer, vec![0, 0, 0, 0]);
        assert!(read_array::<i64, _>(&mut buffer.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn big_endian_layout() {
        let mut buffer = Vec::<u8>::new();
        write_int_array(&[-2, 258], &mut buffer).unwrap();
        assert_eq!(
            buffer,
            vec![0, 0, 0, 2, 0xff, 0xff, 0xff, 0xfe, 0, 0, 1, 2]
        );
    }

    #[test]
    fn consecutive_arrays() {
        let mut buffer = BytesMut::new();
        write_array(&[7u64, u64::MAX], &mut buffer).unwrap();
        write_bool_array(&[false], &mut buffer).unwrap();
        buffer.put_u8(0xAA);

        let mut bytes = buffer.freeze();
        assert_eq!(read_array::<u64, _>(&mut bytes).unwrap(), vec![7, u64::MAX]);
        assert_eq!(read_bool_array(&mut bytes).unwrap(), vec![false]);
        assert_eq!(bytes.get_u8(), 0xAA);
        assert!(!bytes.has_remaining());
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(11)]
    fn overflow_writes_nothing(#[case] capacity: usize) {
        let mut storage = vec![0u8; capacity];
        let mut slice = storage.as_mut_slice();
        let err = write_int_array(&[1, 2, 3], &mut slice).unwrap_err();
        assert!(matches!(err, TabrecError::InvalidArgument(..)));
        assert_eq!(slice.len(), capacity);
        assert!(storage.iter().all(|b| *b == 0));
    }

    #[test]
    fn exact_capacity() {
        let mut storage = vec![0u8; encoded_len::<i32>(3)];
        let mut slice = storage.as_mut_slice();
        write_int_array(&[1, 2, 3], &mut slice).unwrap();
        assert!(slice.is_empty());
    }

    #[rstest]
    #[case(&[0, 0, 0])]
    #[case(&[0, 0, 0, 2, 0, 0, 0, 1])]
    #[case(&[0xff, 0xff, 0xff, 0xff])]
    fn underflow(#[case] bytes: &[u8]) {
        let err = read_int_array(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, TabrecError::InvalidSerde(..)));
    }
}
