use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use readback_interface::native_lib::{NativeReadbackLib, RenderEvent};

/// 主线程侧的 native 回读库入口
///
/// 持有库本身以及发往 render thread 的 channel。
/// 主线程的调用直接进入库；render thread 上的调用封装成 [`RenderEvent`] 发送出去。
#[derive(Clone)]
pub struct NativeReadback {
    lib: Arc<dyn NativeReadbackLib>,
    events: Sender<RenderEvent>,
    warn_on_leaked_tasks: bool,
}
// tools
impl NativeReadback {
    /// 把事件交给 render thread，不等待执行
    pub fn issue(&self, event: RenderEvent) {
        if let Err(e) = self.events.send(event) {
            log::error!("Failed to issue render event {:?}: render thread is gone", e.0);
        }
    }
}
// getters
impl NativeReadback {
    #[inline]
    pub fn lib(&self) -> &dyn NativeReadbackLib {
        self.lib.as_ref()
    }
    #[inline]
    pub fn warn_on_leaked_tasks(&self) -> bool {
        self.warn_on_leaked_tasks
    }
    pub(crate) fn event_sender(&self) -> Sender<RenderEvent> {
        self.events.clone()
    }
}

/// 创建 render event 的 channel
///
/// 返回的 pump 要么由宿主在 render loop 中手动驱动，要么通过 [`RenderEventPump::spawn`]
/// 交给专用线程。
pub fn render_event_channel(
    lib: Arc<dyn NativeReadbackLib>,
    warn_on_leaked_tasks: bool,
) -> (NativeReadback, RenderEventPump) {
    let (events_tx, events_rx) = crossbeam_channel::unbounded::<RenderEvent>();
    let native = NativeReadback {
        lib: lib.clone(),
        events: events_tx,
        warn_on_leaked_tasks,
    };
    let pump = RenderEventPump { lib, events: events_rx };
    (native, pump)
}

/// render thread 侧：按发送顺序执行 render event
pub struct RenderEventPump {
    lib: Arc<dyn NativeReadbackLib>,
    events: Receiver<RenderEvent>,
}
impl RenderEventPump {
    /// 执行当前已经到达的全部事件，返回执行的数量
    ///
    /// 必须在拥有图形上下文的线程上调用。
    pub fn execute_pending(&self) -> usize {
        let mut executed = 0;
        loop {
            match self.events.try_recv() {
                Ok(RenderEvent::Shutdown) | Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                Ok(event) => {
                    execute(self.lib.as_ref(), event);
                    executed += 1;
                }
            }
        }
        executed
    }

    /// 在专用线程上执行事件，直到收到 [`RenderEvent::Shutdown`] 或者 channel 关闭
    ///
    /// `sender` 用于在 [`RenderThread`] drop 时通知线程退出。
    pub fn spawn(self, sender: Sender<RenderEvent>) -> std::io::Result<RenderThread> {
        let join_handle = thread::Builder::new().name("Readback-RenderThread".to_string()).spawn(move || {
            log::info!("readback render thread started");
            while let Ok(event) = self.events.recv() {
                if event == RenderEvent::Shutdown {
                    break;
                }
                execute(self.lib.as_ref(), event);
            }
            log::info!("readback render thread exited");
        })?;

        Ok(RenderThread {
            sender,
            join_handle: Some(join_handle),
        })
    }
}

fn execute(lib: &dyn NativeReadbackLib, event: RenderEvent) {
    log::trace!("execute render event {:?}", event);
    match event {
        RenderEvent::Kickstart(handle) => lib.kickstart(handle),
        RenderEvent::Advance(handle) => lib.advance(handle),
        RenderEvent::AdvanceAll => lib.advance_all(),
        RenderEvent::Shutdown => {}
    }
}

/// 执行 render event 的专用线程
///
/// drop 时通知线程退出并等待，已经发送的事件会先执行完。
pub struct RenderThread {
    sender: Sender<RenderEvent>,
    join_handle: Option<JoinHandle<()>>,
}
impl RenderThread {
    /// 显式等待线程退出
    /// 实际上只是消耗 self，触发 Drop
    pub fn join(self) {}
}
impl Drop for RenderThread {
    fn drop(&mut self) {
        // 线程可能已经因为 channel 关闭而退出，发送失败没有关系
        let _ = self.sender.send(RenderEvent::Shutdown);

        log::info!("waiting for the readback render thread to exit...");
        if let Some(thread) = self.join_handle.take()
            && thread.join().is_err()
        {
            log::error!("Failed to join readback render thread");
        }
    }
}

#[cfg(test)]
mod tests {
    use readback_headless::HeadlessGpu;
    use readback_interface::host::GraphicsHost;

    use super::*;

    #[test]
    fn test_pump_executes_in_order() {
        let gpu = Arc::new(HeadlessGpu::new());
        let buffer = gpu.create_buffer(4, 1);
        let ptr = gpu.native_resource_ptr(buffer).unwrap();
        let (native, pump) = render_event_channel(gpu.clone(), true);

        let handle = native.lib().request_buffer(ptr, 4).unwrap();
        native.issue(RenderEvent::Kickstart(handle));
        native.issue(RenderEvent::Advance(handle));
        assert!(!native.lib().task_done(handle));

        assert_eq!(pump.execute_pending(), 2);
        assert!(native.lib().task_done(handle));
        assert_eq!(pump.execute_pending(), 0);

        native.lib().dispose_task(handle);
    }

    #[test]
    fn test_dedicated_thread_drains_before_exit() {
        let gpu = Arc::new(HeadlessGpu::new());
        let buffer = gpu.create_buffer(4, 1);
        let ptr = gpu.native_resource_ptr(buffer).unwrap();
        let (native, pump) = render_event_channel(gpu.clone(), true);
        let thread = pump.spawn(native.events.clone()).unwrap();

        let handle = native.lib().request_buffer(ptr, 4).unwrap();
        native.issue(RenderEvent::Kickstart(handle));
        native.issue(RenderEvent::AdvanceAll);
        thread.join();

        assert!(gpu.task_done(handle));
        // 线程退出后发送不会 panic
        native.issue(RenderEvent::AdvanceAll);
    }
}
