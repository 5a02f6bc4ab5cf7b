use readback_interface::handles::{NativeResourcePtr, ResourceHandle};
use readback_interface::resource::ResourceDesc;

use crate::context::ReadbackContext;
use crate::error::{ReadbackError, ReadbackResult};
use crate::request::ReadbackRequest;

/// 对同一个资源反复发起回读
///
/// 构造时（一个安全的时间点）解析并记住资源的 native 指针，
/// 之后每次 [`start_readback`](Self::start_readback) 都复用它，不再和 render thread 同步。
pub trait ReadbackStarter {
    fn start_readback(&self, ctx: &mut ReadbackContext) -> ReadbackResult<ReadbackRequest>;
}

/// 后端在构造时确定：宿主支持异步回读时为 None
fn prepare_native_ptr(ctx: &mut ReadbackContext, resource: ResourceHandle) -> ReadbackResult<Option<NativeResourcePtr>> {
    if ctx.host().supports_async_readback() {
        return Ok(None);
    }
    ctx.resolve_native_ptr(resource).map(Some).ok_or(ReadbackError::ResourceDestroyed(resource))
}

fn engine_readback(ctx: &ReadbackContext, resource: ResourceHandle, mip_level: u32) -> ReadbackResult<ReadbackRequest> {
    ctx.host()
        .request_readback(resource, mip_level)
        .map(ReadbackRequest::engine)
        .ok_or(ReadbackError::EngineRequestRejected(resource))
}

pub struct TextureReadbackStarter {
    texture: ResourceHandle,
    mip_level: u32,
    native_ptr: Option<NativeResourcePtr>,
}
// new & init
impl TextureReadbackStarter {
    pub fn new(ctx: &mut ReadbackContext, texture: ResourceHandle, mip_level: u32) -> ReadbackResult<Self> {
        let desc = ctx.host().resource_desc(texture).ok_or(ReadbackError::ResourceDestroyed(texture))?;
        if !desc.is_texture() {
            return Err(ReadbackError::NotATexture(texture));
        }

        let native_ptr = prepare_native_ptr(ctx, texture)?;
        Ok(Self {
            texture,
            mip_level,
            native_ptr,
        })
    }
}
// getters
impl TextureReadbackStarter {
    #[inline]
    pub fn texture(&self) -> ResourceHandle {
        self.texture
    }
    #[inline]
    pub fn mip_level(&self) -> u32 {
        self.mip_level
    }
    #[inline]
    pub fn native_ptr(&self) -> Option<NativeResourcePtr> {
        self.native_ptr
    }
}
impl ReadbackStarter for TextureReadbackStarter {
    fn start_readback(&self, ctx: &mut ReadbackContext) -> ReadbackResult<ReadbackRequest> {
        ctx.ensure_updater();
        if !ctx.host().is_alive(self.texture) {
            return Err(ReadbackError::ResourceDestroyed(self.texture));
        }

        match self.native_ptr {
            Some(ptr) => ReadbackRequest::native_texture(ctx.native(), ptr, self.mip_level),
            None => engine_readback(ctx, self.texture, self.mip_level),
        }
    }
}

pub struct BufferReadbackStarter {
    buffer: ResourceHandle,
    /// 回读的字节数：stride * count
    size: usize,
    native_ptr: Option<NativeResourcePtr>,
}
// new & init
impl BufferReadbackStarter {
    pub fn new(ctx: &mut ReadbackContext, buffer: ResourceHandle) -> ReadbackResult<Self> {
        let desc = ctx.host().resource_desc(buffer).ok_or(ReadbackError::ResourceDestroyed(buffer))?;
        let ResourceDesc::Buffer { stride, count } = desc else {
            return Err(ReadbackError::NotABuffer(buffer));
        };

        let native_ptr = prepare_native_ptr(ctx, buffer)?;
        Ok(Self {
            buffer,
            size: stride as usize * count as usize,
            native_ptr,
        })
    }
}
// getters
impl BufferReadbackStarter {
    #[inline]
    pub fn buffer(&self) -> ResourceHandle {
        self.buffer
    }
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
    #[inline]
    pub fn native_ptr(&self) -> Option<NativeResourcePtr> {
        self.native_ptr
    }
}
impl ReadbackStarter for BufferReadbackStarter {
    fn start_readback(&self, ctx: &mut ReadbackContext) -> ReadbackResult<ReadbackRequest> {
        ctx.ensure_updater();
        if !ctx.host().is_alive(self.buffer) {
            return Err(ReadbackError::ResourceDestroyed(self.buffer));
        }

        match self.native_ptr {
            Some(ptr) => ReadbackRequest::native_buffer(ctx.native(), ptr, self.size),
            None => engine_readback(ctx, self.buffer, 0),
        }
    }
}
