use crate::magnifier::event::{Direction, ViewportEvent};
use crate::magnifier::geometry::Point;
use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterceptOptions {
    /// Forward pointer moves and swallow the wheel while magnifying.
    pub pointer_tracking: bool,
}

/// Low-level mouse messages the interceptor distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMessage {
    RightDown,
    RightUp,
    Wheel,
    Move,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseVerdict {
    pub event: Option<ViewportEvent>,
    /// Stop the message from reaching other applications.
    pub consume: bool,
    pub right_button_down: bool,
}

/// Signed wheel delta from the high word of `mouseData`.
pub fn wheel_delta(mouse_data: u32) -> i16 {
    ((mouse_data >> 16) & 0xFFFF) as u16 as i16
}

/// Decides what a raw mouse message means for the viewport. Runs inside the
/// hook callback, so it must stay cheap.
pub fn translate_mouse(
    message: MouseMessage,
    pos: Point,
    mouse_data: u32,
    right_button_down: bool,
    options: InterceptOptions,
) -> MouseVerdict {
    let mut verdict = MouseVerdict {
        event: None,
        consume: false,
        right_button_down,
    };
    match message {
        MouseMessage::RightDown => {
            verdict.right_button_down = true;
            verdict.event = Some(ViewportEvent::PointerDown(pos));
        }
        MouseMessage::RightUp => {
            verdict.right_button_down = false;
            verdict.event = Some(ViewportEvent::PointerUp);
        }
        MouseMessage::Wheel if right_button_down => {
            let delta = wheel_delta(mouse_data);
            verdict.event = (delta != 0).then_some(ViewportEvent::Wheel(delta));
            // Scrolling while magnifying must not also scroll the window under the pointer.
            verdict.consume = options.pointer_tracking;
        }
        MouseMessage::Move if right_button_down && options.pointer_tracking => {
            verdict.event = Some(ViewportEvent::PointerMove(pos));
        }
        _ => {}
    }
    verdict
}

/// Arrow keys only mean something while the right button is held.
pub fn translate_key(vk_code: u32, right_button_down: bool) -> Option<ViewportEvent> {
    if !right_button_down {
        return None;
    }
    Direction::from_virtual_key(vk_code).map(ViewportEvent::KeyDown)
}

pub trait HookBackend: Send {
    fn install(&mut self, sender: Sender<ViewportEvent>, options: InterceptOptions)
        -> Result<()>;
    fn uninstall(&mut self) -> Result<()>;
    fn is_installed(&self) -> bool;
}

/// Global pointer + keyboard interception feeding the viewport event queue.
pub struct InputInterceptor {
    backend: Box<dyn HookBackend>,
    active: bool,
}

impl InputInterceptor {
    pub fn new(backend: Box<dyn HookBackend>) -> Self {
        Self {
            backend,
            active: false,
        }
    }

    pub fn activate(
        &mut self,
        sender: Sender<ViewportEvent>,
        options: InterceptOptions,
    ) -> Result<()> {
        if self.active {
            return Ok(());
        }
        self.backend
            .install(sender, options)
            .context("failed to set input hooks")?;
        self.active = true;
        tracing::info!(?options, "input hooks installed");
        Ok(())
    }

    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        if let Err(err) = self.backend.uninstall() {
            tracing::warn!(?err, "failed to uninstall input hooks");
        }
        self.active = false;
        tracing::info!("input hooks removed");
    }

    pub fn is_active(&self) -> bool {
        self.active && self.backend.is_installed()
    }
}

impl Drop for InputInterceptor {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg_attr(not(windows), allow(dead_code))]
const READY_TIMEOUT: Duration = Duration::from_secs(2);

/// How a hook thread's startup handshake ended.
#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug)]
enum HookStart {
    Ready(u32),
    Failed(anyhow::Error),
    /// The thread is alive but never confirmed its hooks; it must still be
    /// told to quit so anything it installs late is removed.
    TimedOut(u32),
}

/// Waits for the hook thread's id, then for its install result.
#[cfg_attr(not(windows), allow(dead_code))]
fn await_hook_start(
    id_rx: &Receiver<u32>,
    ready_rx: &Receiver<Result<()>>,
    timeout: Duration,
) -> HookStart {
    let Ok(thread_id) = id_rx.recv() else {
        return HookStart::Failed(anyhow!("hook thread exited before starting"));
    };
    match ready_rx.recv_timeout(timeout) {
        Ok(Ok(())) => HookStart::Ready(thread_id),
        Ok(Err(err)) => HookStart::Failed(err),
        Err(RecvTimeoutError::Timeout) => HookStart::TimedOut(thread_id),
        Err(RecvTimeoutError::Disconnected) => {
            HookStart::Failed(anyhow!("hook thread exited before installing hooks"))
        }
    }
}

#[cfg(windows)]
pub use platform::DefaultHookBackend;

#[cfg(windows)]
mod platform {
    use super::{
        await_hook_start, translate_key, translate_mouse, HookBackend, HookStart,
        InterceptOptions, MouseMessage, READY_TIMEOUT,
    };
    use crate::magnifier::event::ViewportEvent;
    use crate::magnifier::geometry::Point;
    use crate::win_util::WM_APP_INPUT;
    use anyhow::{anyhow, Result};
    use once_cell::sync::OnceCell;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::mpsc::Sender;
    use std::sync::Mutex;
    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, PostThreadMessageW, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSLLHOOKSTRUCT,
        WM_KEYDOWN, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN,
    };

    struct HookThread {
        thread_id: u32,
        join: std::thread::JoinHandle<()>,
    }

    /// Installs `WH_MOUSE_LL` and `WH_KEYBOARD_LL` on a dedicated thread and
    /// wakes `wake_thread_id` with `WM_APP_INPUT` after queueing an event.
    pub struct DefaultHookBackend {
        wake_thread_id: u32,
        hook_thread: Option<HookThread>,
    }

    impl DefaultHookBackend {
        pub fn new(wake_thread_id: u32) -> Self {
            Self {
                wake_thread_id,
                hook_thread: None,
            }
        }
    }

    impl HookBackend for DefaultHookBackend {
        fn install(
            &mut self,
            sender: Sender<ViewportEvent>,
            options: InterceptOptions,
        ) -> Result<()> {
            if self.hook_thread.is_some() {
                return Ok(());
            }

            hook_dispatch().register(sender, options, self.wake_thread_id);

            use windows::Win32::System::LibraryLoader::GetModuleHandleW;
            use windows::Win32::System::Threading::GetCurrentThreadId;
            use windows::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW, TranslateMessage,
                UnhookWindowsHookEx, MSG, PM_NOREMOVE, WH_KEYBOARD_LL, WH_MOUSE_LL,
            };

            // The thread id arrives before any hook exists, so a late or stuck
            // install can still be told to quit and unhook.
            let (id_tx, id_rx) = std::sync::mpsc::sync_channel::<u32>(1);
            // Handshake so install() only returns once both hooks are live.
            let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<()>>(1);

            let join = std::thread::spawn(move || {
                // Ensure the thread has a message queue.
                let mut msg = MSG::default();
                unsafe {
                    let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                }

                let _ = id_tx.send(unsafe { GetCurrentThreadId() });
                let hmodule = match unsafe { GetModuleHandleW(None) } {
                    Ok(h) => h,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow!(err)));
                        return;
                    }
                };

                let mouse_hook = match unsafe {
                    SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hmodule, 0)
                } {
                    Ok(h) if !h.0.is_null() => h,
                    Ok(_) => {
                        let _ = ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                        return;
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow!(err)));
                        return;
                    }
                };

                let keyboard_hook = match unsafe {
                    SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), hmodule, 0)
                } {
                    Ok(h) if !h.0.is_null() => h,
                    other => {
                        let err = match other {
                            Err(err) => anyhow!(err),
                            Ok(_) => anyhow!(windows::core::Error::from_win32()),
                        };
                        let _ = ready_tx.send(Err(err));
                        unsafe {
                            let _ = UnhookWindowsHookEx(mouse_hook);
                        }
                        return;
                    }
                };

                let _ = ready_tx.send(Ok(()));

                // Low-level hook callbacks only arrive while this loop pumps.
                loop {
                    let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                    if r.0 <= 0 {
                        break;
                    }
                    unsafe {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    }
                }

                unsafe {
                    let _ = UnhookWindowsHookEx(mouse_hook);
                    let _ = UnhookWindowsHookEx(keyboard_hook);
                }
            });

            match await_hook_start(&id_rx, &ready_rx, READY_TIMEOUT) {
                HookStart::Ready(thread_id) => {
                    self.hook_thread = Some(HookThread { thread_id, join });
                    Ok(())
                }
                HookStart::Failed(err) => {
                    hook_dispatch().clear();
                    let _ = join.join();
                    Err(err)
                }
                HookStart::TimedOut(thread_id) => {
                    hook_dispatch().clear();
                    stop_hook_thread(HookThread { thread_id, join });
                    Err(anyhow!("hook thread did not signal readiness"))
                }
            }
        }

        fn uninstall(&mut self) -> Result<()> {
            // Stop dispatch first so nothing new is queued while shutting down.
            hook_dispatch().clear();

            if let Some(th) = self.hook_thread.take() {
                stop_hook_thread(th);
            }
            Ok(())
        }

        fn is_installed(&self) -> bool {
            self.hook_thread.is_some()
        }
    }

    /// Ends the hook thread's message loop; the thread unhooks before exiting.
    fn stop_hook_thread(th: HookThread) {
        use windows::Win32::UI::WindowsAndMessaging::WM_QUIT;
        unsafe {
            let _ = PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        let _ = th.join.join();
    }

    /// State the hook procedures can reach. Hook callbacks cannot capture
    /// anything, so `install` registers the sender and wake target here.
    struct HookDispatch {
        enabled: AtomicBool,
        right_down: AtomicBool,
        pointer_tracking: AtomicBool,
        wake_thread_id: AtomicU32,
        sender: Mutex<Option<Sender<ViewportEvent>>>,
    }

    impl HookDispatch {
        fn register(
            &self,
            sender: Sender<ViewportEvent>,
            options: InterceptOptions,
            wake_thread_id: u32,
        ) {
            if let Ok(mut guard) = self.sender.lock() {
                *guard = Some(sender);
            }
            self.pointer_tracking
                .store(options.pointer_tracking, Ordering::Release);
            self.wake_thread_id.store(wake_thread_id, Ordering::Release);
            self.right_down.store(false, Ordering::Release);
            self.enabled.store(true, Ordering::Release);
        }

        fn clear(&self) {
            self.enabled.store(false, Ordering::Release);
            self.right_down.store(false, Ordering::Release);
            if let Ok(mut guard) = self.sender.lock() {
                *guard = None;
            }
        }

        fn is_enabled(&self) -> bool {
            self.enabled.load(Ordering::Acquire)
        }

        fn right_down(&self) -> bool {
            self.right_down.load(Ordering::Acquire)
        }

        fn set_right_down(&self, down: bool) {
            self.right_down.store(down, Ordering::Release);
        }

        fn options(&self) -> InterceptOptions {
            InterceptOptions {
                pointer_tracking: self.pointer_tracking.load(Ordering::Acquire),
            }
        }

        fn forward(&self, event: ViewportEvent) {
            let sent = match self.sender.try_lock() {
                Ok(guard) => guard
                    .as_ref()
                    .map(|sender| sender.send(event).is_ok())
                    .unwrap_or(false),
                Err(_) => false,
            };
            if sent {
                let thread_id = self.wake_thread_id.load(Ordering::Acquire);
                unsafe {
                    let _ = PostThreadMessageW(thread_id, WM_APP_INPUT, WPARAM(0), LPARAM(0));
                }
            }
        }
    }

    static HOOK_DISPATCH: OnceCell<HookDispatch> = OnceCell::new();

    fn hook_dispatch() -> &'static HookDispatch {
        HOOK_DISPATCH.get_or_init(|| HookDispatch {
            enabled: AtomicBool::new(false),
            right_down: AtomicBool::new(false),
            pointer_tracking: AtomicBool::new(false),
            wake_thread_id: AtomicU32::new(0),
            sender: Mutex::new(None),
        })
    }

    fn mouse_message(msg: u32) -> MouseMessage {
        match msg {
            WM_RBUTTONDOWN => MouseMessage::RightDown,
            WM_RBUTTONUP => MouseMessage::RightUp,
            WM_MOUSEWHEEL => MouseMessage::Wheel,
            WM_MOUSEMOVE => MouseMessage::Move,
            _ => MouseMessage::Other,
        }
    }

    unsafe extern "system" fn mouse_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        if n_code == HC_ACTION as i32 {
            let dispatch = hook_dispatch();
            if dispatch.is_enabled() {
                let message = mouse_message(w_param.0 as u32);
                if message != MouseMessage::Other {
                    let info = &*(l_param.0 as *const MSLLHOOKSTRUCT);
                    let verdict = translate_mouse(
                        message,
                        Point::new(info.pt.x, info.pt.y),
                        info.mouseData,
                        dispatch.right_down(),
                        dispatch.options(),
                    );
                    dispatch.set_right_down(verdict.right_button_down);
                    if let Some(event) = verdict.event {
                        dispatch.forward(event);
                    }
                    if verdict.consume {
                        return LRESULT(1);
                    }
                }
            }
        }

        CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
    }

    unsafe extern "system" fn keyboard_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        if n_code == HC_ACTION as i32 {
            let msg = w_param.0 as u32;
            if msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN {
                let dispatch = hook_dispatch();
                if dispatch.is_enabled() {
                    let info = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
                    if let Some(event) = translate_key(info.vkCode, dispatch.right_down()) {
                        dispatch.forward(event);
                    }
                }
            }
        }

        CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
    }
}

#[cfg(not(windows))]
#[derive(Default)]
pub struct DefaultHookBackend;

#[cfg(not(windows))]
impl DefaultHookBackend {
    pub fn new(_wake_thread_id: u32) -> Self {
        Self
    }
}

#[cfg(not(windows))]
impl HookBackend for DefaultHookBackend {
    fn install(
        &mut self,
        _sender: Sender<ViewportEvent>,
        _options: InterceptOptions,
    ) -> Result<()> {
        Err(anyhow!("global input hooks are not supported on this platform"))
    }

    fn uninstall(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_installed(&self) -> bool {
        false
    }
}

/// In-process stand-in for the platform hooks. Raw messages pushed through
/// the handle go through the same translation the real hook procs use.
#[derive(Clone)]
pub struct MockHookBackend {
    state: Arc<MockHookState>,
}

#[derive(Default)]
struct MockHookState {
    install_count: AtomicUsize,
    uninstall_count: AtomicUsize,
    fail_install: AtomicBool,
    right_down: AtomicBool,
    options: Mutex<InterceptOptions>,
    sender: Mutex<Option<Sender<ViewportEvent>>>,
}

impl MockHookBackend {
    pub fn new() -> (Self, MockHookHandle) {
        let state = Arc::new(MockHookState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHookHandle { state },
        )
    }
}

impl HookBackend for MockHookBackend {
    fn install(&mut self, sender: Sender<ViewportEvent>, options: InterceptOptions) -> Result<()> {
        if self.state.fail_install.load(Ordering::SeqCst) {
            return Err(anyhow!("hook installation refused"));
        }
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_none() {
            self.state.install_count.fetch_add(1, Ordering::SeqCst);
            *guard = Some(sender);
            if let Ok(mut stored) = self.state.options.lock() {
                *stored = options;
            }
        }
        Ok(())
    }

    fn uninstall(&mut self) -> Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_some() {
            self.state.uninstall_count.fetch_add(1, Ordering::SeqCst);
        }
        *guard = None;
        self.state.right_down.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_installed(&self) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => false,
        }
    }
}

pub struct MockHookHandle {
    state: Arc<MockHookState>,
}

impl MockHookHandle {
    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.uninstall_count.load(Ordering::SeqCst)
    }

    pub fn refuse_install(&self) {
        self.state.fail_install.store(true, Ordering::SeqCst);
    }

    pub fn emit(&self, event: ViewportEvent) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|sender| sender.send(event).is_ok())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Feeds a raw mouse message; returns whether the hook would swallow it.
    pub fn mouse(&self, message: MouseMessage, pos: Point, mouse_data: u32) -> bool {
        let options = self
            .state
            .options
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default();
        let verdict = translate_mouse(
            message,
            pos,
            mouse_data,
            self.state.right_down.load(Ordering::SeqCst),
            options,
        );
        self.state
            .right_down
            .store(verdict.right_button_down, Ordering::SeqCst);
        if let Some(event) = verdict.event {
            self.emit(event);
        }
        verdict.consume
    }

    pub fn key_down(&self, vk_code: u32) {
        if let Some(event) = translate_key(vk_code, self.state.right_down.load(Ordering::SeqCst)) {
            self.emit(event);
        }
    }
}
