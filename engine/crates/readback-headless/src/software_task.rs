use readback_interface::handles::{NativeResourcePtr, TaskHandle};
use readback_interface::native_lib::NativeReadbackLib;
use readback_interface::resource::ResourceDesc;

use crate::headless_gpu::{GpuState, HeadlessGpu};

/// 回读的数据来源
#[derive(Clone, Copy, Debug)]
pub(crate) enum TaskSource {
    Texture { texture: NativeResourcePtr, mip_level: u32 },
    Buffer { buffer: NativeResourcePtr, size: usize },
}

/// native 库中的一个回读任务
///
/// 状态流转: created -> (kickstart) initialized -> (fence signaled) done
///                                   \-> error + done
pub(crate) struct SoftwareTask {
    source: TaskSource,
    initialized: bool,
    done: bool,
    error: bool,
    /// 还需要多少次 advance，fence 才会 signaled
    fence_remaining: u32,
    /// kickstart 时拷贝出来的数据，相当于 pbo
    staging: Vec<u8>,
    /// fence signaled 之后对主线程可见的数据
    data: Option<Vec<u8>>,
    completed_frame: Option<u64>,
}

impl SoftwareTask {
    fn new(source: TaskSource) -> Self {
        Self {
            source,
            initialized: false,
            done: false,
            error: false,
            fence_remaining: 0,
            staging: Vec::new(),
            data: None,
            completed_frame: None,
        }
    }

    /// 在 render thread 上启动任务
    fn start(&mut self, state_snapshot: Result<Vec<u8>, String>, latency: u32, frame_id: u64) {
        self.initialized = true;
        match state_snapshot {
            Ok(bytes) => {
                self.staging = bytes;
                self.fence_remaining = latency.max(1);
            }
            Err(reason) => {
                log::warn!("readback task failed to start: {}", reason);
                self.error = true;
                self.done = true;
                self.completed_frame = Some(frame_id);
            }
        }
    }

    /// 检查 fence，signaled 之后把 staging 中的数据交给主线程
    fn poll_fence(&mut self, frame_id: u64) {
        if !self.initialized || self.done {
            return;
        }
        self.fence_remaining = self.fence_remaining.saturating_sub(1);
        if self.fence_remaining == 0 {
            self.data = Some(std::mem::take(&mut self.staging));
            self.done = true;
            self.completed_frame = Some(frame_id);
        }
    }
}

/// 从资源中拷贝任务需要的数据
fn snapshot(state: &GpuState, source: TaskSource) -> Result<Vec<u8>, String> {
    match source {
        TaskSource::Texture { texture, mip_level } => {
            let resource = state.resource_by_native(texture).ok_or_else(|| format!("texture {} is gone", texture))?;
            if !resource.desc.is_texture() {
                return Err(format!("{} is not a texture", texture));
            }
            let level = resource
                .levels
                .get(mip_level as usize)
                .ok_or_else(|| format!("mip {} out of range for {}", mip_level, texture))?;
            if level.is_empty() {
                return Err(format!("texture {} has zero size", texture));
            }
            Ok(level.clone())
        }
        TaskSource::Buffer { buffer, size } => {
            let resource = state.resource_by_native(buffer).ok_or_else(|| format!("buffer {} is gone", buffer))?;
            let ResourceDesc::Buffer { .. } = resource.desc else {
                return Err(format!("{} is not a buffer", buffer));
            };
            let bytes = &resource.levels[0];
            if size == 0 || size > bytes.len() {
                return Err(format!("size {} out of range for {} ({} bytes)", size, buffer, bytes.len()));
            }
            Ok(bytes[..size].to_vec())
        }
    }
}

impl HeadlessGpu {
    fn insert_task(&self, source: TaskSource) -> Option<TaskHandle> {
        let mut state = self.state();
        if let Some(limit) = self.task_limit
            && state.tasks.len() >= limit
        {
            log::error!("no free task slot (limit {})", limit);
            return None;
        }

        let handle = TaskHandle(state.next_task_id);
        state.next_task_id += 1;
        state.tasks.insert(handle, SoftwareTask::new(source));
        log::trace!("insert {} for {:?}", handle, source);
        Some(handle)
    }
}

impl NativeReadbackLib for HeadlessGpu {
    fn is_compatible(&self) -> bool {
        true
    }

    fn request_texture(&self, texture: NativeResourcePtr, mip_level: u32) -> Option<TaskHandle> {
        self.insert_task(TaskSource::Texture { texture, mip_level })
    }

    fn request_buffer(&self, buffer: NativeResourcePtr, size: usize) -> Option<TaskHandle> {
        self.insert_task(TaskSource::Buffer { buffer, size })
    }

    fn task_exists(&self, handle: TaskHandle) -> bool {
        self.state().tasks.contains_key(&handle)
    }

    fn task_done(&self, handle: TaskHandle) -> bool {
        self.state().tasks.get(&handle).is_some_and(|task| task.done)
    }

    fn task_error(&self, handle: TaskHandle) -> bool {
        self.state().tasks.get(&handle).is_some_and(|task| task.error)
    }

    fn copy_task_data(&self, handle: TaskHandle, dst: &mut Vec<u8>) -> bool {
        dst.clear();
        let state = self.state();
        match state.tasks.get(&handle).and_then(|task| task.data.as_ref()) {
            Some(data) => {
                dst.extend_from_slice(data);
                true
            }
            None => false,
        }
    }

    fn dispose_task(&self, handle: TaskHandle) {
        if self.state().tasks.remove(&handle).is_none() {
            log::warn!("dispose unknown {}", handle);
        }
    }

    fn update_main_thread(&self) {
        let mut guard = self.state();
        let state = &mut *guard;
        state.frame_counter.next_frame();

        // 回收完成之后长期没有被 dispose 的任务
        let stale_frames = self.stale_task_frames;
        let frame_counter = &state.frame_counter;
        state.tasks.retain(|handle, task| match task.completed_frame {
            Some(completed) if frame_counter.frames_since(completed) > stale_frames => {
                log::warn!("reclaim {}: completed at frame {} but never disposed", handle, completed);
                false
            }
            _ => true,
        });
    }

    fn kickstart(&self, handle: TaskHandle) {
        let mut state = self.state();
        let frame_id = state.frame_counter.frame_id();
        let Some(source) = state.tasks.get(&handle).filter(|task| !task.initialized).map(|task| task.source) else {
            // 任务可能已经被主线程 dispose
            return;
        };
        let bytes = snapshot(&state, source);
        if let Some(task) = state.tasks.get_mut(&handle) {
            task.start(bytes, self.fence_latency, frame_id);
        }
    }

    fn advance(&self, handle: TaskHandle) {
        let mut state = self.state();
        let frame_id = state.frame_counter.frame_id();
        if let Some(task) = state.tasks.get_mut(&handle) {
            task.poll_fence(frame_id);
        }
    }

    fn advance_all(&self) {
        let mut state = self.state();
        let frame_id = state.frame_counter.frame_id();
        for task in state.tasks.values_mut() {
            task.poll_fence(frame_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use readback_interface::host::GraphicsHost;

    use super::*;

    #[test]
    fn test_task_done_only_after_advance() {
        let gpu = HeadlessGpu::new().with_fence_latency(2);
        let buffer = gpu.create_buffer(4, 4);
        gpu.write_buffer(buffer, 0, &[7; 16]);
        let native = gpu.native_resource_ptr(buffer).unwrap();

        let handle = gpu.request_buffer(native, 16).unwrap();
        gpu.kickstart(handle);
        assert!(!gpu.task_done(handle));
        gpu.advance(handle);
        assert!(!gpu.task_done(handle));
        gpu.advance_all();
        assert!(gpu.task_done(handle));
        assert!(!gpu.task_error(handle));

        let mut dst = Vec::new();
        assert!(gpu.copy_task_data(handle, &mut dst));
        assert_eq!(dst, vec![7; 16]);

        gpu.dispose_task(handle);
        assert!(!gpu.task_exists(handle));
    }

    #[test]
    fn test_advance_before_kickstart_does_nothing() {
        let gpu = HeadlessGpu::new();
        let texture = gpu.create_texture(2, 2, 4, 1);
        let native = gpu.native_resource_ptr(texture).unwrap();

        let handle = gpu.request_texture(native, 0).unwrap();
        gpu.advance(handle);
        assert!(!gpu.task_done(handle));
        gpu.kickstart(handle);
        gpu.advance(handle);
        assert!(gpu.task_done(handle));
    }

    #[test]
    fn test_destroyed_source_sets_error_and_done() {
        let gpu = HeadlessGpu::new();
        let texture = gpu.create_texture(2, 2, 4, 1);
        let native = gpu.native_resource_ptr(texture).unwrap();

        let handle = gpu.request_texture(native, 0).unwrap();
        gpu.destroy_resource(texture);
        gpu.kickstart(handle);
        assert!(gpu.task_done(handle));
        assert!(gpu.task_error(handle));
        assert!(!gpu.copy_task_data(handle, &mut Vec::new()));
    }

    #[test]
    fn test_mip_out_of_range_is_error() {
        let gpu = HeadlessGpu::new();
        let texture = gpu.create_texture(4, 4, 4, 2);
        let native = gpu.native_resource_ptr(texture).unwrap();

        let handle = gpu.request_texture(native, 5).unwrap();
        gpu.kickstart(handle);
        assert!(gpu.task_error(handle));
    }

    #[test]
    fn test_task_limit() {
        let gpu = HeadlessGpu::new().with_task_limit(1);
        let buffer = gpu.create_buffer(4, 1);
        let native = gpu.native_resource_ptr(buffer).unwrap();

        let first = gpu.request_buffer(native, 4);
        assert!(first.is_some());
        assert!(gpu.request_buffer(native, 4).is_none());
    }

    #[test]
    fn test_stale_task_is_reclaimed() {
        let gpu = HeadlessGpu::new().with_stale_task_frames(2);
        let buffer = gpu.create_buffer(4, 1);
        let native = gpu.native_resource_ptr(buffer).unwrap();

        let handle = gpu.request_buffer(native, 4).unwrap();
        gpu.kickstart(handle);
        gpu.advance(handle);
        assert!(gpu.task_done(handle));

        for _ in 0..3 {
            assert!(gpu.task_exists(handle));
            gpu.update_main_thread();
        }
        assert!(!gpu.task_exists(handle));
    }
}
