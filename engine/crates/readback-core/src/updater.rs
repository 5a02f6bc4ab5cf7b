use readback_interface::frame_counter::FrameCounter;
use readback_interface::host::GraphicsHost;

use crate::native_task::NativeReadbackTask;
use crate::pointer_cache::ResourcePointerCache;
use crate::render_thread::NativeReadback;

/// 每帧一次的全局更新
///
/// 即使调用方没有逐个 update 请求，native 库的任务也会被推进；同时清理指针缓存。
pub struct ReadbackUpdater {
    frame_counter: FrameCounter,
}
impl Default for ReadbackUpdater {
    fn default() -> Self {
        Self::new()
    }
}
impl ReadbackUpdater {
    pub fn new() -> Self {
        Self {
            frame_counter: FrameCounter::new(0),
        }
    }

    /// 返回本帧从缓存中移除的条目数
    pub fn tick(&mut self, native: &NativeReadback, cache: &mut ResourcePointerCache, host: &dyn GraphicsHost) -> usize {
        NativeReadbackTask::update_all(native);
        let reclaimed = cache.reclaim(host);
        if reclaimed > 0 {
            log::debug!("{} reclaim {} pointer cache entries", self.frame_counter.frame_name(), reclaimed);
        }

        self.frame_counter.next_frame();
        reclaimed
    }

    /// 已经执行过的 tick 次数
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_counter.frame_id()
    }
}
