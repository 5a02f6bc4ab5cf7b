use bytemuck::Pod;

use crate::error::{ReadbackError, ReadbackResult};

/// 把回读得到的字节重新解释为 `T` 的数组
///
/// 字节数必须是 `size_of::<T>()` 的整数倍，否则返回 [`ReadbackError::SizeMismatch`]。
/// 结果是一份新的拷贝，不要求输入满足 `T` 的对齐。
pub(crate) fn cast_payload<T: Pod>(bytes: &[u8]) -> ReadbackResult<Vec<T>> {
    let elem_size = size_of::<T>();
    if elem_size == 0 || bytes.len() % elem_size != 0 {
        return Err(ReadbackError::SizeMismatch {
            len: bytes.len(),
            elem_size,
        });
    }

    let mut elements = vec![T::zeroed(); bytes.len() / elem_size];
    bytemuck::cast_slice_mut::<T, u8>(&mut elements).copy_from_slice(bytes);
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_floats() {
        let bytes: Vec<u8> = [1.0f32, 2.5, -3.0].iter().flat_map(|f| f.to_ne_bytes()).collect();
        let floats = cast_payload::<f32>(&bytes).unwrap();
        assert_eq!(floats, vec![1.0, 2.5, -3.0]);
    }

    #[test]
    fn test_unaligned_input_is_copied() {
        let bytes = vec![0u8, 1, 0, 0, 0];
        let ints = cast_payload::<u32>(&bytes[1..]).unwrap();
        assert_eq!(ints, vec![u32::from_ne_bytes([1, 0, 0, 0])]);
    }

    #[test]
    fn test_size_mismatch() {
        let err = cast_payload::<f32>(&[0u8; 6]).unwrap_err();
        assert_eq!(err, ReadbackError::SizeMismatch { len: 6, elem_size: 4 });
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(cast_payload::<u32>(&[]).unwrap(), Vec::<u32>::new());
    }
}
