use readback_interface::handles::{NativeResourcePtr, ResourceHandle};
use readback_interface::host::GraphicsHost;
use slotmap::SecondaryMap;

/// 资源 native 指针的缓存
///
/// [`GraphicsHost::native_resource_ptr`] 需要和 render thread 同步，开销很大；
/// 第一次查询之后记录下来，之后直接返回缓存的值。
///
/// 资源销毁后，缓存项在下一次 [`ResourcePointerCache::reclaim`] 时移除，
/// 之后再 resolve 会重新询问宿主，不会返回过期的指针。
/// 只在主线程上使用。
#[derive(Default)]
pub struct ResourcePointerCache {
    entries: SecondaryMap<ResourceHandle, NativeResourcePtr>,
    /// 实际调用宿主查询的次数
    host_lookups: u64,
}
// new & init
impl ResourcePointerCache {
    pub fn new() -> Self {
        Self::default()
    }
}
// tools
impl ResourcePointerCache {
    /// 查询资源的 native 指针，第一次查询时访问宿主
    ///
    /// 资源已销毁，或者宿主没有给出指针时返回 None，此时不会缓存任何内容。
    pub fn resolve(&mut self, host: &dyn GraphicsHost, resource: ResourceHandle) -> Option<NativeResourcePtr> {
        if let Some(&ptr) = self.entries.get(resource) {
            return Some(ptr);
        }

        self.host_lookups += 1;
        let ptr = host.native_resource_ptr(resource)?;
        self.entries.insert(resource, ptr);
        log::trace!("cache native ptr {} for {:?}", ptr, resource);
        Some(ptr)
    }

    /// 移除已经销毁的资源，返回移除的数量
    ///
    /// 每帧调用一次，而不是在每次 resolve 时检查。
    pub fn reclaim(&mut self, host: &dyn GraphicsHost) -> usize {
        let before = self.entries.len();
        self.entries.retain(|resource, _| host.is_alive(resource));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
// getters
impl ResourcePointerCache {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    #[inline]
    pub fn contains(&self, resource: ResourceHandle) -> bool {
        self.entries.contains_key(resource)
    }
    #[inline]
    pub fn host_lookups(&self) -> u64 {
        self.host_lookups
    }
}

#[cfg(test)]
mod tests {
    use readback_headless::HeadlessGpu;

    use super::*;

    #[test]
    fn test_resolve_twice_looks_up_once() {
        let gpu = HeadlessGpu::new();
        let texture = gpu.create_texture(16, 16, 4, 1);
        let mut cache = ResourcePointerCache::new();

        let first = cache.resolve(&gpu, texture);
        let second = cache.resolve(&gpu, texture);
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(cache.host_lookups(), 1);
        assert_eq!(gpu.native_ptr_lookups(), 1);
    }

    #[test]
    fn test_reclaim_removes_destroyed_resources() {
        let gpu = HeadlessGpu::new();
        let kept = gpu.create_buffer(4, 4);
        let destroyed = gpu.create_buffer(4, 4);
        let mut cache = ResourcePointerCache::new();
        cache.resolve(&gpu, kept);
        cache.resolve(&gpu, destroyed);
        assert_eq!(cache.len(), 2);

        gpu.destroy_resource(destroyed);
        assert_eq!(cache.reclaim(&gpu), 1);
        assert!(cache.contains(kept));
        assert!(!cache.contains(destroyed));

        // 重新询问宿主，而不是返回过期的指针
        assert_eq!(cache.resolve(&gpu, destroyed), None);
        assert_eq!(cache.host_lookups(), 3);
        assert!(cache.resolve(&gpu, kept).is_some());
        assert_eq!(cache.host_lookups(), 3);
    }

    #[test]
    fn test_unresolved_resource_is_not_cached() {
        let gpu = HeadlessGpu::new();
        let buffer = gpu.create_buffer(4, 4);
        gpu.destroy_resource(buffer);

        let mut cache = ResourcePointerCache::new();
        assert_eq!(cache.resolve(&gpu, buffer), None);
        assert_eq!(cache.resolve(&gpu, buffer), None);
        assert!(cache.is_empty());
        assert_eq!(cache.host_lookups(), 2);
    }
}
