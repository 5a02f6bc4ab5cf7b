use readback_interface::host::EngineReadbackRequest;

/// 模拟引擎原生的异步回读请求
///
/// 发起时就拍下数据快照，经过 `latency` 次 update 之后 done。
pub struct HeadlessEngineRequest {
    remaining: u32,
    data: Option<Vec<u8>>,
    error: bool,
}

impl HeadlessEngineRequest {
    pub fn new(data: Vec<u8>, latency: u32) -> Self {
        Self {
            remaining: latency.max(1),
            data: Some(data),
            error: false,
        }
    }

    /// 一个立即失败的请求，例如 mip 越界
    pub fn failed() -> Self {
        Self {
            remaining: 0,
            data: None,
            error: true,
        }
    }
}

impl EngineReadbackRequest for HeadlessEngineRequest {
    fn update(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    fn done(&self) -> bool {
        self.remaining == 0
    }

    fn has_error(&self) -> bool {
        self.error
    }

    fn data(&self) -> Option<&[u8]> {
        if self.done() && !self.error { self.data.as_deref() } else { None }
    }
}
