use readback_interface::handles::ResourceHandle;

pub type ReadbackResult<T> = Result<T, ReadbackError>;

/// 可恢复的回读错误
///
/// 生命周期上的误用（操作已经 dispose 的请求、dispose 两次、dispose 未完成的请求）
/// 不在这里：它们是调用方的 bug，会直接 panic。
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadbackError {
    #[error("the readback request is not done yet")]
    NotReady,

    #[error("the readback request failed on the GPU")]
    Failed,

    #[error("readback payload of {len} bytes is not a multiple of the element size {elem_size}")]
    SizeMismatch { len: usize, elem_size: usize },

    #[error("the native readback library could not allocate a task")]
    TaskAllocation,

    #[error("resource {0:?} has been destroyed")]
    ResourceDestroyed(ResourceHandle),

    #[error("resource {0:?} is not a texture")]
    NotATexture(ResourceHandle),

    #[error("resource {0:?} is not a buffer")]
    NotABuffer(ResourceHandle),

    #[error("the host engine rejected the readback of {0:?}")]
    EngineRequestRejected(ResourceHandle),
}
