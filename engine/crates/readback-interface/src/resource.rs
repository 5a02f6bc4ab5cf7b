/// GPU 资源的描述信息
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResourceDesc {
    Texture {
        width: u32,
        height: u32,
        mip_count: u32,
        /// 每个像素的字节数，由 internal format 决定
        bytes_per_pixel: u32,
    },
    Buffer {
        stride: u32,
        count: u32,
    },
}

impl ResourceDesc {
    #[inline]
    pub fn is_texture(&self) -> bool {
        matches!(self, Self::Texture { .. })
    }

    #[inline]
    pub fn is_buffer(&self) -> bool {
        matches!(self, Self::Buffer { .. })
    }

    /// 指定 mip 的尺寸，mip 越界时返回 None
    pub fn mip_extent(&self, mip: u32) -> Option<(u32, u32)> {
        match *self {
            Self::Texture {
                width,
                height,
                mip_count,
                ..
            } if mip < mip_count => Some(((width >> mip).max(1), (height >> mip).max(1))),
            _ => None,
        }
    }

    /// 回读需要的字节数
    ///
    /// - texture：指定 mip 的 `width * height * bytes_per_pixel`
    /// - buffer：`stride * count`，忽略 mip
    pub fn readback_size(&self, mip: u32) -> Option<usize> {
        match *self {
            Self::Texture { bytes_per_pixel, .. } => {
                let (w, h) = self.mip_extent(mip)?;
                Some(w as usize * h as usize * bytes_per_pixel as usize)
            }
            Self::Buffer { stride, count } => Some(stride as usize * count as usize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_mip_size() {
        let desc = ResourceDesc::Texture {
            width: 1000,
            height: 500,
            mip_count: 3,
            bytes_per_pixel: 4,
        };
        assert_eq!(desc.readback_size(0), Some(1000 * 500 * 4));
        assert_eq!(desc.readback_size(2), Some(250 * 125 * 4));
        assert_eq!(desc.readback_size(3), None);
    }

    #[test]
    fn test_buffer_size_is_stride_times_count() {
        let desc = ResourceDesc::Buffer { stride: 4, count: 100 };
        assert_eq!(desc.readback_size(0), Some(400));
        assert_eq!(desc.mip_extent(0), None);
    }
}
