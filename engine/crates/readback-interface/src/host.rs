use crate::handles::{NativeResourcePtr, ResourceHandle};
use crate::resource::ResourceDesc;

/// 宿主引擎自带的异步回读请求
///
/// 引擎保证请求在自己的生命周期内有效，回读层把它当作黑盒使用。
pub trait EngineReadbackRequest {
    /// 推进请求的状态，每帧调用
    fn update(&mut self);

    fn done(&self) -> bool;

    fn has_error(&self) -> bool;

    /// 回读结果，仅在 done 之后可用
    ///
    /// 按照引擎的约定，这块内存只在当前帧内有效。
    fn data(&self) -> Option<&[u8]>;
}

/// 宿主引擎（图形子系统）
pub trait GraphicsHost {
    /// 当前图形后端是否原生支持异步回读
    fn supports_async_readback(&self) -> bool;

    /// 资源是否还存活；销毁后的 handle 永远返回 false
    fn is_alive(&self, resource: ResourceHandle) -> bool;

    /// 查询资源在图形驱动中的标识
    ///
    /// 开销较大：通常需要和 render thread 同步，调用方应当缓存结果。
    fn native_resource_ptr(&self, resource: ResourceHandle) -> Option<NativeResourcePtr>;

    fn resource_desc(&self, resource: ResourceHandle) -> Option<ResourceDesc>;

    /// 通过引擎自带的能力发起回读
    ///
    /// 只有 [`GraphicsHost::supports_async_readback`] 为 true 时才会被调用；
    /// 对于 buffer，`mip_level` 被忽略。
    fn request_readback(&self, resource: ResourceHandle, mip_level: u32) -> Option<Box<dyn EngineReadbackRequest>>;
}
