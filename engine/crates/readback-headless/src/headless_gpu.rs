use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use readback_interface::frame_counter::FrameCounter;
use readback_interface::handles::{NativeResourcePtr, ResourceHandle, TaskHandle};
use readback_interface::host::{EngineReadbackRequest, GraphicsHost};
use readback_interface::resource::ResourceDesc;
use slotmap::SlotMap;

use crate::engine_request::HeadlessEngineRequest;
use crate::software_task::SoftwareTask;

/// 内存中的一个 GPU 资源
pub(crate) struct HeadlessResource {
    pub(crate) native: NativeResourcePtr,
    pub(crate) desc: ResourceDesc,
    /// texture：每个 mip 一段；buffer：只有一段
    pub(crate) levels: Vec<Vec<u8>>,
}

pub(crate) struct GpuState {
    pub(crate) resources: SlotMap<ResourceHandle, HeadlessResource>,
    /// 用于驱动侧的反查：native ptr -> 资源
    pub(crate) native_lookup: HashMap<NativeResourcePtr, ResourceHandle>,
    next_native_name: u64,
    /// 统计 native_resource_ptr 被调用的次数（模拟的同步开销）
    ptr_lookups: u64,

    pub(crate) tasks: BTreeMap<TaskHandle, SoftwareTask>,
    pub(crate) next_task_id: i32,
    pub(crate) frame_counter: FrameCounter,
}
impl GpuState {
    /// 根据 native ptr 找到资源，资源已销毁时返回 None
    pub(crate) fn resource_by_native(&self, native: NativeResourcePtr) -> Option<&HeadlessResource> {
        let handle = self.native_lookup.get(&native)?;
        self.resources.get(*handle)
    }
}

/// headless 设备
///
/// 所有状态都在一把锁后面：主线程和 render thread 都会访问，
/// 和 native 插件中 `tasks_mutex` 的作用相同。
pub struct HeadlessGpu {
    state: Mutex<GpuState>,

    supports_async_readback: bool,
    /// fence 需要经过多少次 advance 才会 signaled
    pub(crate) fence_latency: u32,
    /// 完成后一直没有被 dispose 的任务，超过多少帧会被回收
    pub(crate) stale_task_frames: u64,
    /// 同时存在的任务数上限，超过时 request 失败
    pub(crate) task_limit: Option<usize>,
}
impl Default for HeadlessGpu {
    fn default() -> Self {
        Self::new()
    }
}
// new & init
impl HeadlessGpu {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GpuState {
                resources: SlotMap::with_key(),
                native_lookup: HashMap::new(),
                next_native_name: 1,
                ptr_lookups: 0,
                tasks: BTreeMap::new(),
                next_task_id: 1,
                frame_counter: FrameCounter::new(0),
            }),
            supports_async_readback: false,
            fence_latency: 1,
            stale_task_frames: 300,
            task_limit: None,
        }
    }

    /// 模拟原生支持异步回读的图形后端
    pub fn with_async_readback(mut self, supported: bool) -> Self {
        self.supports_async_readback = supported;
        self
    }

    pub fn with_fence_latency(mut self, latency: u32) -> Self {
        self.fence_latency = latency.max(1);
        self
    }

    pub fn with_stale_task_frames(mut self, frames: u64) -> Self {
        self.stale_task_frames = frames;
        self
    }

    pub fn with_task_limit(mut self, limit: usize) -> Self {
        self.task_limit = Some(limit);
        self
    }
}
// tools
impl HeadlessGpu {
    pub(crate) fn state(&self) -> MutexGuard<'_, GpuState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
// 资源 API
impl HeadlessGpu {
    /// 创建 texture，内容初始化为 0
    pub fn create_texture(&self, width: u32, height: u32, bytes_per_pixel: u32, mip_count: u32) -> ResourceHandle {
        let desc = ResourceDesc::Texture {
            width,
            height,
            mip_count: mip_count.max(1),
            bytes_per_pixel,
        };
        let levels = (0..mip_count.max(1))
            .map(|mip| vec![0u8; desc.readback_size(mip).unwrap_or(0)])
            .collect();
        self.insert_resource(desc, levels)
    }

    /// 创建 buffer，内容初始化为 0
    pub fn create_buffer(&self, stride: u32, count: u32) -> ResourceHandle {
        let desc = ResourceDesc::Buffer { stride, count };
        let levels = vec![vec![0u8; stride as usize * count as usize]];
        self.insert_resource(desc, levels)
    }

    fn insert_resource(&self, desc: ResourceDesc, levels: Vec<Vec<u8>>) -> ResourceHandle {
        let mut state = self.state();
        let native = NativeResourcePtr(state.next_native_name);
        state.next_native_name += 1;

        let handle = state.resources.insert(HeadlessResource { native, desc, levels });
        state.native_lookup.insert(native, handle);
        log::debug!("create resource {:?} as {}: {:?}", handle, native, desc);
        handle
    }

    /// 写入 texture 的某个 mip，长度必须和 mip 的大小一致
    pub fn write_texture(&self, texture: ResourceHandle, mip: u32, data: &[u8]) -> bool {
        let mut state = self.state();
        let Some(resource) = state.resources.get_mut(texture) else {
            return false;
        };
        match resource.levels.get_mut(mip as usize) {
            Some(level) if resource.desc.is_texture() && level.len() == data.len() => {
                level.copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    /// 从 `offset` 开始写入 buffer
    pub fn write_buffer(&self, buffer: ResourceHandle, offset: usize, data: &[u8]) -> bool {
        let mut state = self.state();
        let Some(resource) = state.resources.get_mut(buffer) else {
            return false;
        };
        if !resource.desc.is_buffer() {
            return false;
        }
        let level = &mut resource.levels[0];
        match offset.checked_add(data.len()) {
            Some(end) if end <= level.len() => {
                level[offset..end].copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    /// 销毁资源，之后 handle 和 native ptr 都失效
    pub fn destroy_resource(&self, resource: ResourceHandle) -> bool {
        let mut state = self.state();
        match state.resources.remove(resource) {
            Some(removed) => {
                state.native_lookup.remove(&removed.native);
                log::debug!("destroy resource {:?} ({})", resource, removed.native);
                true
            }
            None => false,
        }
    }
}
// getters
impl HeadlessGpu {
    /// native_resource_ptr 被调用的次数
    pub fn native_ptr_lookups(&self) -> u64 {
        self.state().ptr_lookups
    }

    /// native 库中仍然存在的任务数
    pub fn live_task_count(&self) -> usize {
        self.state().tasks.len()
    }

    /// update_main_thread 被调用的次数
    pub fn frame_id(&self) -> u64 {
        self.state().frame_counter.frame_id()
    }
}

impl GraphicsHost for HeadlessGpu {
    fn supports_async_readback(&self) -> bool {
        self.supports_async_readback
    }

    fn is_alive(&self, resource: ResourceHandle) -> bool {
        self.state().resources.contains_key(resource)
    }

    fn native_resource_ptr(&self, resource: ResourceHandle) -> Option<NativeResourcePtr> {
        let mut state = self.state();
        state.ptr_lookups += 1;
        state.resources.get(resource).map(|r| r.native)
    }

    fn resource_desc(&self, resource: ResourceHandle) -> Option<ResourceDesc> {
        self.state().resources.get(resource).map(|r| r.desc)
    }

    fn request_readback(&self, resource: ResourceHandle, mip_level: u32) -> Option<Box<dyn EngineReadbackRequest>> {
        if !self.supports_async_readback {
            return None;
        }

        let state = self.state();
        let resource = state.resources.get(resource)?;
        let level = match resource.desc {
            ResourceDesc::Texture { .. } => mip_level as usize,
            ResourceDesc::Buffer { .. } => 0,
        };
        let request = match resource.levels.get(level) {
            Some(bytes) => HeadlessEngineRequest::new(bytes.clone(), self.fence_latency),
            None => HeadlessEngineRequest::failed(),
        };
        Some(Box::new(request))
    }
}
