use bytemuck::Pod;
use readback_interface::handles::{NativeResourcePtr, ResourceHandle};
use readback_interface::host::EngineReadbackRequest;
use readback_interface::resource::ResourceDesc;

use crate::context::ReadbackContext;
use crate::error::{ReadbackError, ReadbackResult};
use crate::native_task::NativeReadbackTask;
use crate::payload::cast_payload;
use crate::render_thread::NativeReadback;

/// 宿主引擎自带的回读请求
pub struct EngineRequest {
    request: Box<dyn EngineReadbackRequest>,
    /// 只是一个标记：引擎自己管理请求的内存
    disposed: bool,
}

/// 统一的回读请求
///
/// 后端在创建时确定，之后不会改变。使用顺序：
/// 先检查 [`valid`](Self::valid)，再 [`update`](Self::update)，
/// 然后查询 [`has_error`](Self::has_error) / [`done`](Self::done)，最后取数据并 [`dispose`](Self::dispose)。
pub enum ReadbackRequest {
    /// 图形后端原生支持异步回读
    Engine(EngineRequest),
    /// 通过 native 库实现的回读
    Native(NativeReadbackTask),
}
// new & init
impl ReadbackRequest {
    /// 回读 texture 的某个 mip
    pub fn request_texture(ctx: &mut ReadbackContext, texture: ResourceHandle, mip_level: u32) -> ReadbackResult<Self> {
        ctx.ensure_updater();
        let desc = ctx.host().resource_desc(texture).ok_or(ReadbackError::ResourceDestroyed(texture))?;
        if !desc.is_texture() {
            return Err(ReadbackError::NotATexture(texture));
        }

        if ctx.host().supports_async_readback() {
            return Self::from_engine(ctx, texture, mip_level);
        }

        let ptr = ctx.resolve_native_ptr(texture).ok_or(ReadbackError::ResourceDestroyed(texture))?;
        Self::native_texture(ctx.native(), ptr, mip_level)
    }

    /// 回读整个 buffer，长度为 stride * count
    pub fn request_buffer(ctx: &mut ReadbackContext, buffer: ResourceHandle) -> ReadbackResult<Self> {
        ctx.ensure_updater();
        let desc = ctx.host().resource_desc(buffer).ok_or(ReadbackError::ResourceDestroyed(buffer))?;
        let ResourceDesc::Buffer { stride, count } = desc else {
            return Err(ReadbackError::NotABuffer(buffer));
        };

        if ctx.host().supports_async_readback() {
            return Self::from_engine(ctx, buffer, 0);
        }

        let ptr = ctx.resolve_native_ptr(buffer).ok_or(ReadbackError::ResourceDestroyed(buffer))?;
        Self::native_buffer(ctx.native(), ptr, stride as usize * count as usize)
    }

    fn from_engine(ctx: &ReadbackContext, resource: ResourceHandle, mip_level: u32) -> ReadbackResult<Self> {
        let request = ctx
            .host()
            .request_readback(resource, mip_level)
            .ok_or(ReadbackError::EngineRequestRejected(resource))?;
        Ok(Self::engine(request))
    }

    /// 包装一个引擎自带的请求
    pub fn engine(request: Box<dyn EngineReadbackRequest>) -> Self {
        Self::Engine(EngineRequest {
            request,
            disposed: false,
        })
    }

    /// 使用已经解析好的 native 指针
    pub fn native_texture(native: &NativeReadback, texture: NativeResourcePtr, mip_level: u32) -> ReadbackResult<Self> {
        NativeReadbackTask::create_texture(native, texture, mip_level).map(Self::Native)
    }

    pub fn native_buffer(native: &NativeReadback, buffer: NativeResourcePtr, size: usize) -> ReadbackResult<Self> {
        NativeReadbackTask::create_buffer(native, buffer, size).map(Self::Native)
    }
}
// tools
impl ReadbackRequest {
    /// 推进请求，每帧调用
    pub fn update(&mut self) {
        match self {
            Self::Engine(engine) => engine.request.update(),
            Self::Native(task) => task.update(),
        }
    }

    /// 请求是否还能使用
    ///
    /// native 后端的任务可能被 native 库回收，调用其它方法之前需要先检查。
    pub fn valid(&self) -> bool {
        match self {
            Self::Engine(engine) => !engine.disposed,
            Self::Native(task) => task.is_valid(),
        }
    }

    pub fn done(&self) -> bool {
        match self {
            Self::Engine(engine) => engine.request.done(),
            Self::Native(task) => task.done(),
        }
    }

    pub fn has_error(&self) -> bool {
        match self {
            Self::Engine(engine) => engine.request.has_error(),
            Self::Native(task) => task.has_error(),
        }
    }

    /// 把结果拷贝出来并解释为 `T` 的数组
    pub fn get_data<T: Pod>(&self) -> ReadbackResult<Vec<T>> {
        match self {
            Self::Engine(engine) => {
                let request = &engine.request;
                if !request.done() {
                    return Err(ReadbackError::NotReady);
                }
                if request.has_error() {
                    return Err(ReadbackError::Failed);
                }
                // 引擎的内存只在当前帧有效，这里总是拷贝一份
                let bytes = request.data().ok_or(ReadbackError::NotReady)?;
                cast_payload(bytes)
            }
            Self::Native(task) => task.get_data(),
        }
    }

    /// 释放请求
    ///
    /// 引擎后端只是打上标记，可以重复调用；native 后端会释放 native 内存，只能调用一次。
    pub fn dispose(&mut self) {
        match self {
            Self::Engine(engine) => engine.disposed = true,
            Self::Native(task) => task.dispose(),
        }
    }
}
// getters
impl ReadbackRequest {
    #[inline]
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native(_))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use readback_headless::HeadlessGpu;

    use super::*;
    use crate::test_utils::manual_context;

    #[test]
    fn test_backend_follows_host_capability() {
        let gpu = Arc::new(HeadlessGpu::new());
        let mut ctx = manual_context(&gpu);
        let buffer = gpu.create_buffer(4, 4);
        let request = ReadbackRequest::request_buffer(&mut ctx, buffer).unwrap();
        assert!(request.is_native());

        let capable = Arc::new(HeadlessGpu::new().with_async_readback(true));
        let mut ctx = manual_context(&capable);
        let buffer = capable.create_buffer(4, 4);
        let request = ReadbackRequest::request_buffer(&mut ctx, buffer).unwrap();
        assert!(!request.is_native());
    }

    #[test]
    fn test_engine_dispose_is_advisory() {
        let gpu = Arc::new(HeadlessGpu::new().with_async_readback(true));
        let mut ctx = manual_context(&gpu);
        let buffer = gpu.create_buffer(4, 2);
        let bytes: Vec<u8> = [1u32, 2].iter().flat_map(|v| v.to_ne_bytes()).collect();
        gpu.write_buffer(buffer, 0, &bytes);

        let mut request = ReadbackRequest::request_buffer(&mut ctx, buffer).unwrap();
        assert!(request.valid());
        assert!(!request.done());
        assert_eq!(request.get_data::<u32>(), Err(ReadbackError::NotReady));

        request.update();
        assert!(request.done());
        assert_eq!(request.get_data::<u32>().unwrap(), vec![1, 2]);

        request.dispose();
        assert!(!request.valid());
        request.dispose();
        assert!(!request.valid());
    }

    #[test]
    fn test_native_buffer_request() {
        let gpu = Arc::new(HeadlessGpu::new());
        let mut ctx = manual_context(&gpu);
        let buffer = gpu.create_buffer(4, 100);

        let mut request = ReadbackRequest::request_buffer(&mut ctx, buffer).unwrap();
        assert!(request.valid());
        ctx.pump_render_events();
        assert!(!request.done());

        request.update();
        ctx.pump_render_events();
        assert!(request.done());
        assert!(!request.has_error());
        assert_eq!(request.get_data::<f32>().unwrap(), vec![0.0f32; 100]);

        request.dispose();
        assert!(!request.valid());
    }

    #[test]
    #[should_panic]
    fn test_native_double_dispose_panics() {
        let gpu = Arc::new(HeadlessGpu::new());
        let mut ctx = manual_context(&gpu);
        let buffer = gpu.create_buffer(4, 1);

        let mut request = ReadbackRequest::request_buffer(&mut ctx, buffer).unwrap();
        request.update();
        ctx.pump_render_events();
        request.dispose();
        request.dispose();
    }

    #[test]
    fn test_fallback_path_uses_pointer_cache() {
        let gpu = Arc::new(HeadlessGpu::new());
        let mut ctx = manual_context(&gpu);
        let texture = gpu.create_texture(4, 4, 4, 1);

        for _ in 0..3 {
            let mut request = ReadbackRequest::request_texture(&mut ctx, texture, 0).unwrap();
            request.update();
            ctx.pump_render_events();
            request.dispose();
        }
        assert_eq!(gpu.native_ptr_lookups(), 1);
        assert!(ctx.pointer_cache().contains(texture));
    }

    #[test]
    fn test_wrong_kind_and_destroyed() {
        let gpu = Arc::new(HeadlessGpu::new());
        let mut ctx = manual_context(&gpu);
        let texture = gpu.create_texture(4, 4, 4, 1);
        let buffer = gpu.create_buffer(4, 4);

        assert!(matches!(
            ReadbackRequest::request_buffer(&mut ctx, texture),
            Err(ReadbackError::NotABuffer(_))
        ));
        assert!(matches!(
            ReadbackRequest::request_texture(&mut ctx, buffer, 0),
            Err(ReadbackError::NotATexture(_))
        ));

        gpu.destroy_resource(buffer);
        assert!(matches!(
            ReadbackRequest::request_buffer(&mut ctx, buffer),
            Err(ReadbackError::ResourceDestroyed(_))
        ));
    }

    #[test]
    fn test_engine_error_request() {
        let gpu = Arc::new(HeadlessGpu::new().with_async_readback(true));
        let mut ctx = manual_context(&gpu);
        let texture = gpu.create_texture(4, 4, 4, 1);

        let request = ReadbackRequest::request_texture(&mut ctx, texture, 4).unwrap();
        assert!(request.done());
        assert!(request.has_error());
        assert_eq!(request.get_data::<u8>(), Err(ReadbackError::Failed));
    }
}
