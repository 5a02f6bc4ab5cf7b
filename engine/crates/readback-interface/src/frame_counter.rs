pub struct FrameCounter {
    /// 当前的帧序号，一直累加
    frame_id: u64,
}
impl Default for FrameCounter {
    fn default() -> Self {
        Self::new(0)
    }
}
// new & init
impl FrameCounter {
    pub fn new(init_frame_id: u64) -> Self {
        Self { frame_id: init_frame_id }
    }
}
// update
impl FrameCounter {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}]", self.frame_id)
    }
    /// 从 `since` 到当前帧经过了多少帧
    #[inline]
    pub fn frames_since(&self, since: u64) -> u64 {
        self.frame_id.wrapping_sub(since)
    }
}
