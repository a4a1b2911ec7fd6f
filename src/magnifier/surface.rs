use crate::magnifier::geometry::{Point, Rect, Transform};

/// Rendering collaborator that displays the magnified region.
///
/// These four operations are the whole contract between the viewport and the
/// platform magnifier. Implementations log their own failures; the viewport
/// has nothing useful to do with them.
pub trait OverlaySurface {
    fn set_transform(&mut self, transform: Transform);
    fn set_source(&mut self, rect: Rect);
    fn show(&mut self);
    fn hide(&mut self);
    /// Move the top-left corner of the overlay window.
    fn move_to(&mut self, top_left: Point);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceCall {
    SetTransform(Transform),
    SetSource(Rect),
    Show,
    Hide,
    MoveTo(Point),
}

/// Surface that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: Vec<SurfaceCall>,
    visible: bool,
}

impl RecordingSurface {
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn last_source(&self) -> Option<Rect> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::SetSource(rect) => Some(*rect),
            _ => None,
        })
    }

    pub fn last_transform(&self) -> Option<Transform> {
        self.calls.iter().rev().find_map(|call| match call {
            SurfaceCall::SetTransform(transform) => Some(*transform),
            _ => None,
        })
    }
}

impl OverlaySurface for RecordingSurface {
    fn set_transform(&mut self, transform: Transform) {
        self.calls.push(SurfaceCall::SetTransform(transform));
    }

    fn set_source(&mut self, rect: Rect) {
        self.calls.push(SurfaceCall::SetSource(rect));
    }

    fn show(&mut self) {
        self.visible = true;
        self.calls.push(SurfaceCall::Show);
    }

    fn hide(&mut self) {
        self.visible = false;
        self.calls.push(SurfaceCall::Hide);
    }

    fn move_to(&mut self, top_left: Point) {
        self.calls.push(SurfaceCall::MoveTo(top_left));
    }
}

#[cfg(windows)]
pub use platform::MagnifierWindow;

#[cfg(windows)]
mod platform {
    use super::OverlaySurface;
    use crate::magnifier::config::ViewportConfig;
    use crate::magnifier::geometry::{Point, Rect, ScreenMetrics, Transform};
    use crate::magnifier::state::centered_window;
    use crate::win_util::{load_app_icon, to_wide, WM_APP_DISPLAY_CHANGED, WM_TRAY_CALLBACK};
    use anyhow::{anyhow, Context, Result};
    use windows::core::{w, PCWSTR};
    use windows::Win32::Foundation::{
        COLORREF, HWND, LPARAM, LRESULT, RECT, TRUE, WPARAM,
    };
    use windows::Win32::Graphics::Gdi::{CreateEllipticRgn, InvalidateRect, SetWindowRgn};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::Magnification::{
        MagSetWindowSource, MagSetWindowTransform, MAGTRANSFORM,
    };
    use windows::Win32::UI::Shell::{
        Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, IsWindow, LoadCursorW,
        PostQuitMessage, PostThreadMessageW, RegisterClassW, SetLayeredWindowAttributes,
        SetWindowPos, ShowWindow, HICON, HWND_TOPMOST, IDC_ARROW, LWA_ALPHA, SWP_NOACTIVATE,
        SWP_NOSIZE, SW_HIDE, SW_SHOWNA, WINDOW_EX_STYLE, WM_DESTROY, WM_DISPLAYCHANGE,
        WM_RBUTTONUP, WNDCLASSW, WS_CHILD, WS_EX_LAYERED, WS_EX_TOOLWINDOW, WS_EX_TOPMOST,
        WS_EX_TRANSPARENT, WS_POPUP, WS_VISIBLE,
    };

    const TRAY_ID: u32 = 1;
    const TRAY_TIP: &str = "Magnifier+ (Right-click to exit)";

    /// Layered popup hosting the system magnifier control.
    pub struct MagnifierWindow {
        host: HWND,
        control: HWND,
        tray: Option<TrayIcon>,
    }

    impl MagnifierWindow {
        pub fn create(config: &ViewportConfig, screen: ScreenMetrics) -> Result<Self> {
            let (width, height) = config.window();
            let hinstance = unsafe { GetModuleHandleW(None) }.context("resolve module handle")?;
            let icon = load_app_icon();
            let class_name = w!("MagnifierPlusWindowClass");

            let wc = WNDCLASSW {
                lpfnWndProc: Some(host_wndproc),
                hInstance: hinstance.into(),
                lpszClassName: class_name,
                hIcon: icon,
                hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
                ..Default::default()
            };
            if unsafe { RegisterClassW(&wc) } == 0 {
                return Err(anyhow!(windows::core::Error::from_win32()))
                    .context("window registration failed");
            }

            let (x, y) = if config.pointer_tracking {
                (0, 0)
            } else {
                let top_left = centered_window(screen, (width, height));
                (top_left.x, top_left.y)
            };
            let title = to_wide("Magnifier+ (Right-click + Scroll: Zoom | Arrows: Move)");
            let host = unsafe {
                CreateWindowExW(
                    WS_EX_TOPMOST | WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOOLWINDOW,
                    class_name,
                    PCWSTR(title.as_ptr()),
                    WS_POPUP,
                    x,
                    y,
                    width,
                    height,
                    None,
                    None,
                    hinstance,
                    None,
                )
            }
            .context("window creation failed")?;

            // From here on Drop owns the host window.
            let mut window = Self {
                host,
                control: HWND::default(),
                tray: None,
            };

            unsafe {
                let _ = SetLayeredWindowAttributes(host, COLORREF(0), 255, LWA_ALPHA);
            }

            if config.circular {
                unsafe {
                    let region = CreateEllipticRgn(0, 0, width, height);
                    // The window owns the region once it is set.
                    if SetWindowRgn(host, region, TRUE) == 0 {
                        tracing::warn!("failed to apply circular window region");
                    }
                }
            }

            window.control = unsafe {
                CreateWindowExW(
                    WINDOW_EX_STYLE(0),
                    w!("Magnifier"),
                    PCWSTR::null(),
                    WS_CHILD | WS_VISIBLE,
                    0,
                    0,
                    width,
                    height,
                    host,
                    None,
                    hinstance,
                    None,
                )
            }
            .context("failed to create magnifier control")?;

            window.tray = TrayIcon::add(host, icon, TRAY_TIP);
            tracing::info!(width, height, x, y, circular = config.circular, "magnifier window created");
            Ok(window)
        }
    }

    impl OverlaySurface for MagnifierWindow {
        fn set_transform(&mut self, transform: Transform) {
            let mut matrix = MAGTRANSFORM {
                v: transform.matrix(),
            };
            if !unsafe { MagSetWindowTransform(self.control, &mut matrix) }.as_bool() {
                tracing::warn!(?transform, "MagSetWindowTransform failed");
            }
        }

        fn set_source(&mut self, rect: Rect) {
            let source = RECT {
                left: rect.left,
                top: rect.top,
                right: rect.right,
                bottom: rect.bottom,
            };
            unsafe {
                if !MagSetWindowSource(self.control, source).as_bool() {
                    tracing::warn!(?rect, "MagSetWindowSource failed");
                }
                let _ = InvalidateRect(self.control, None, TRUE);
            }
        }

        fn show(&mut self) {
            unsafe {
                let _ = ShowWindow(self.host, SW_SHOWNA);
            }
        }

        fn hide(&mut self) {
            unsafe {
                let _ = ShowWindow(self.host, SW_HIDE);
            }
        }

        fn move_to(&mut self, top_left: Point) {
            let moved = unsafe {
                SetWindowPos(
                    self.host,
                    HWND_TOPMOST,
                    top_left.x,
                    top_left.y,
                    0,
                    0,
                    SWP_NOSIZE | SWP_NOACTIVATE,
                )
            };
            if let Err(err) = moved {
                tracing::warn!(?err, "failed to reposition magnifier window");
            }
        }
    }

    impl Drop for MagnifierWindow {
        fn drop(&mut self) {
            self.tray = None;
            unsafe {
                if IsWindow(self.host).as_bool() {
                    let _ = DestroyWindow(self.host);
                }
            }
        }
    }

    struct TrayIcon {
        hwnd: HWND,
    }

    impl TrayIcon {
        fn add(hwnd: HWND, icon: HICON, tip: &str) -> Option<Self> {
            let mut nid = NOTIFYICONDATAW {
                cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
                hWnd: hwnd,
                uID: TRAY_ID,
                uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
                uCallbackMessage: WM_TRAY_CALLBACK,
                hIcon: icon,
                ..Default::default()
            };
            let tip_wide: Vec<u16> = tip.encode_utf16().collect();
            let copy_len = tip_wide.len().min(nid.szTip.len() - 1);
            nid.szTip[..copy_len].copy_from_slice(&tip_wide[..copy_len]);

            if unsafe { Shell_NotifyIconW(NIM_ADD, &nid) }.as_bool() {
                Some(Self { hwnd })
            } else {
                tracing::warn!("failed to add tray icon");
                None
            }
        }
    }

    impl Drop for TrayIcon {
        fn drop(&mut self) {
            let nid = NOTIFYICONDATAW {
                cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
                hWnd: self.hwnd,
                uID: TRAY_ID,
                ..Default::default()
            };
            unsafe {
                let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
            }
        }
    }

    unsafe extern "system" fn host_wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_TRAY_CALLBACK => {
                if lparam.0 as u32 == WM_RBUTTONUP {
                    tracing::info!("exit requested from tray icon");
                    let _ = DestroyWindow(hwnd);
                }
                LRESULT(0)
            }
            WM_DISPLAYCHANGE => {
                let _ = PostThreadMessageW(
                    GetCurrentThreadId(),
                    WM_APP_DISPLAY_CHANGED,
                    WPARAM(0),
                    LPARAM(0),
                );
                DefWindowProcW(hwnd, msg, wparam, lparam)
            }
            WM_DESTROY => {
                PostQuitMessage(0);
                LRESULT(0)
            }
            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }
}
