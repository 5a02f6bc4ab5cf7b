use std::sync::Arc;

use anyhow::Context;
use readback_interface::handles::{NativeResourcePtr, ResourceHandle};
use readback_interface::host::GraphicsHost;
use readback_interface::native_lib::NativeReadbackLib;

use crate::pointer_cache::ResourcePointerCache;
use crate::render_thread::{NativeReadback, RenderEventPump, RenderThread, render_event_channel};
use crate::settings::{ReadbackSettings, RenderThreadMode};
use crate::updater::ReadbackUpdater;

/// 回读层的全部状态
///
/// 宿主引擎、native 库、指针缓存、每帧的 updater 以及 render event 的执行者都在这里，
/// 由调用方显式持有。可以同时存在多个互不相干的 context。
pub struct ReadbackContext {
    host: Arc<dyn GraphicsHost>,
    native: NativeReadback,
    pointer_cache: ResourcePointerCache,

    /// 第一次提交请求或者第一次 on_frame 时创建
    updater: Option<ReadbackUpdater>,

    /// [`RenderThreadMode::Dedicated`]
    render_thread: Option<RenderThread>,
    /// [`RenderThreadMode::Manual`]
    render_pump: Option<RenderEventPump>,

    settings: ReadbackSettings,
}
// new & init
impl ReadbackContext {
    pub fn new(
        host: Arc<dyn GraphicsHost>,
        native_lib: Arc<dyn NativeReadbackLib>,
        settings: ReadbackSettings,
    ) -> anyhow::Result<Self> {
        if !host.supports_async_readback() && !native_lib.is_compatible() {
            log::warn!("the graphics backend has no async readback and the native library is not compatible");
        }

        let (native, pump) = render_event_channel(native_lib, settings.warn_on_leaked_tasks);
        let (render_thread, render_pump) = match settings.render_thread {
            RenderThreadMode::Dedicated => {
                let thread = pump.spawn(native.event_sender()).context("Failed to spawn readback render thread")?;
                (Some(thread), None)
            }
            RenderThreadMode::Manual => (None, Some(pump)),
        };

        log::info!(
            "readback context created: engine readback {}, render thread {:?}",
            host.supports_async_readback(),
            settings.render_thread
        );
        Ok(Self {
            host,
            native,
            pointer_cache: ResourcePointerCache::new(),
            updater: None,
            render_thread,
            render_pump,
            settings,
        })
    }

    pub(crate) fn ensure_updater(&mut self) {
        lazy_updater(&mut self.updater);
    }
}

fn lazy_updater(updater: &mut Option<ReadbackUpdater>) -> &mut ReadbackUpdater {
    updater.get_or_insert_with(|| {
        log::debug!("create readback updater");
        ReadbackUpdater::new()
    })
}
// update
impl ReadbackContext {
    /// 每帧调用一次，即使当前没有任何请求
    ///
    /// 返回本帧从指针缓存中移除的条目数。
    pub fn on_frame(&mut self) -> usize {
        lazy_updater(&mut self.updater).tick(&self.native, &mut self.pointer_cache, self.host.as_ref())
    }

    /// 执行已经发送的 render event
    ///
    /// 只在 [`RenderThreadMode::Manual`] 下有效，需要在拥有图形上下文的线程上调用；
    /// 使用专用线程时返回 0。
    pub fn pump_render_events(&self) -> usize {
        self.render_pump.as_ref().map_or(0, RenderEventPump::execute_pending)
    }
}
// tools
impl ReadbackContext {
    /// 通过指针缓存解析资源的 native 指针
    pub fn resolve_native_ptr(&mut self, resource: ResourceHandle) -> Option<NativeResourcePtr> {
        self.pointer_cache.resolve(self.host.as_ref(), resource)
    }

    /// 销毁 updater、清空缓存并等待 render thread 退出
    ///
    /// 尚未 dispose 的 native 请求仍然持有 native 库，可以在之后继续查询和 dispose。
    pub fn shutdown(mut self) {
        if let Some(updater) = self.updater.take() {
            log::info!("readback updater destroyed after {} frames", updater.frame_id());
        }
        self.pointer_cache.clear();
        if let Some(pump) = self.render_pump.take() {
            pump.execute_pending();
        }
        if let Some(thread) = self.render_thread.take() {
            thread.join();
        }
    }
}
// getters
impl ReadbackContext {
    #[inline]
    pub fn host(&self) -> &Arc<dyn GraphicsHost> {
        &self.host
    }
    #[inline]
    pub fn native(&self) -> &NativeReadback {
        &self.native
    }
    #[inline]
    pub fn settings(&self) -> &ReadbackSettings {
        &self.settings
    }
    #[inline]
    pub fn pointer_cache(&self) -> &ResourcePointerCache {
        &self.pointer_cache
    }
    /// updater 还没有创建时为 None
    #[inline]
    pub fn frame_id(&self) -> Option<u64> {
        self.updater.as_ref().map(ReadbackUpdater::frame_id)
    }
}
