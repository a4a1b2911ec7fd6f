//! Small Win32 helpers shared by the window, hook and runtime code.

#[cfg(windows)]
pub use platform::*;

/// Reports a fatal error to the user. Without a desktop the message goes to
/// stderr.
#[cfg(not(windows))]
pub fn show_error(title: &str, message: &str) {
    eprintln!("{title}: {message}");
}

#[cfg(windows)]
mod platform {
    use crate::magnifier::geometry::ScreenMetrics;
    use anyhow::{anyhow, Context, Result};
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE, TRUE};
    use windows::Win32::System::Threading::CreateMutexW;
    use windows::Win32::UI::Magnification::{MagInitialize, MagUninitialize};
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, LoadIconW, LoadImageW, MessageBoxW, HICON, IDI_APPLICATION, IMAGE_ICON,
        LR_DEFAULTSIZE, LR_LOADFROMFILE, LR_SHARED, MB_ICONERROR, MB_ICONINFORMATION, MB_OK,
        MESSAGEBOX_STYLE, SM_CXSCREEN, SM_CYSCREEN, WM_APP, WM_USER,
    };

    /// Posted to the UI thread when hook events are waiting in the queue.
    pub const WM_APP_INPUT: u32 = WM_APP + 1;
    /// Posted to the UI thread after the display configuration changed.
    pub const WM_APP_DISPLAY_CHANGED: u32 = WM_APP + 2;
    pub const WM_TRAY_CALLBACK: u32 = WM_USER + 1;

    const ICON_FILE_NAME: &str = "reticle.ico";

    pub fn to_wide(s: &str) -> Vec<u16> {
        OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
    }

    pub fn primary_screen() -> ScreenMetrics {
        unsafe { ScreenMetrics::new(GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }

    pub fn show_info(title: &str, message: &str) {
        message_box(title, message, MB_OK | MB_ICONINFORMATION);
    }

    pub fn show_error(title: &str, message: &str) {
        message_box(title, message, MB_OK | MB_ICONERROR);
    }

    fn message_box(title: &str, message: &str, style: MESSAGEBOX_STYLE) {
        let title = to_wide(title);
        let message = to_wide(message);
        unsafe {
            let _ = MessageBoxW(
                None,
                PCWSTR(message.as_ptr()),
                PCWSTR(title.as_ptr()),
                style,
            );
        }
    }

    /// Named mutex held for the lifetime of the process.
    pub struct InstanceGuard {
        handle: HANDLE,
    }

    impl InstanceGuard {
        /// Returns `None` when another process already owns `name`.
        pub fn acquire(name: &str) -> Result<Option<Self>> {
            let wide = to_wide(name);
            let handle = unsafe { CreateMutexW(None, TRUE, PCWSTR(wide.as_ptr())) }
                .context("failed to create instance mutex")?;
            if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
                unsafe {
                    let _ = CloseHandle(handle);
                }
                return Ok(None);
            }
            Ok(Some(Self { handle }))
        }
    }

    impl Drop for InstanceGuard {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.handle);
            }
        }
    }

    /// Keeps the magnification runtime initialized while alive.
    pub struct MagnificationRuntime(());

    impl MagnificationRuntime {
        pub fn initialize() -> Result<Self> {
            if unsafe { MagInitialize() }.as_bool() {
                tracing::debug!("magnification runtime initialized");
                Ok(Self(()))
            } else {
                Err(anyhow!(windows::core::Error::from_win32()))
                    .context("failed to initialize magnification")
            }
        }
    }

    impl Drop for MagnificationRuntime {
        fn drop(&mut self) {
            if !unsafe { MagUninitialize() }.as_bool() {
                tracing::warn!("MagUninitialize failed");
            }
        }
    }

    /// Icon shipped next to the executable, or the stock application icon.
    pub fn load_app_icon() -> HICON {
        let path = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(ICON_FILE_NAME)))
            .filter(|path| path.exists());
        if let Some(path) = path {
            let wide = to_wide(&path.to_string_lossy());
            let loaded = unsafe {
                LoadImageW(
                    None,
                    PCWSTR(wide.as_ptr()),
                    IMAGE_ICON,
                    0,
                    0,
                    LR_LOADFROMFILE | LR_DEFAULTSIZE | LR_SHARED,
                )
            };
            match loaded {
                Ok(handle) => return HICON(handle.0),
                Err(err) => tracing::warn!(?err, path = %path.display(), "failed to load icon"),
            }
        }
        unsafe { LoadIconW(None, IDI_APPLICATION) }.unwrap_or_default()
    }
}
