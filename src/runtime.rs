//! Fire-and-forget task spawning on the platform executor.

use std::future::Future;

/// `Send` on desktop, where tasks may hop threads. Every type qualifies in
/// the browser, which is single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T> MaybeSend for T {}

/// Spawns detached futures: onto a tokio runtime on desktop, onto the
/// browser's microtask queue on the web.
#[derive(Debug, Clone)]
pub struct Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    handle: tokio::runtime::Handle,
}

impl Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Picks up the runtime the caller is running inside.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }

    #[cfg(target_arch = "wasm32")]
    pub fn local() -> Self {
        Self {}
    }

    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + MaybeSend + 'static,
    {
        #[cfg(not(target_arch = "wasm32"))]
        self.handle.spawn(fut);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(fut);
    }
}
