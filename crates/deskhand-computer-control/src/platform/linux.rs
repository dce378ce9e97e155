//! X11 backend: XTest for synthetic input, `_NET_*` EWMH hints for windows.

use crate::types::{MouseButton, Point, ScreenSize, WindowInfo};
use crate::{ComputerController, PointerProbe};
use anyhow::{Context, Result};
use async_trait::async_trait;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_long, c_uchar, c_uint, c_ulong};
use std::ptr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, Once};
use std::time::Duration;
use x11::xlib;
use x11::xtest;

const BUTTON_LEFT: c_uint = 1;
const BUTTON_MIDDLE: c_uint = 2;
const BUTTON_RIGHT: c_uint = 3;
const BUTTON_SCROLL_UP: c_uint = 4;
const BUTTON_SCROLL_DOWN: c_uint = 5;

const XK_SHIFT_L: xlib::KeySym = 0xffe1;
const XK_RETURN: xlib::KeySym = 0xff0d;
const XK_TAB: xlib::KeySym = 0xff09;

const CLICK_INTERVAL: Duration = Duration::from_millis(40);
const KEYSTROKE_INTERVAL: Duration = Duration::from_millis(10);

static INIT: Once = Once::new();
static LAST_X_ERROR: AtomicU8 = AtomicU8::new(0);

unsafe extern "C" fn record_x_error(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if !event.is_null() {
        LAST_X_ERROR.store((*event).error_code, Ordering::SeqCst);
    }
    0
}

struct DisplayHandle(*mut xlib::Display);

// Xlib is initialised with XInitThreads and every call goes through the mutex.
unsafe impl Send for DisplayHandle {}

pub struct LinuxController {
    display: Mutex<DisplayHandle>,
}

impl LinuxController {
    pub fn new() -> Result<Self> {
        INIT.call_once(|| unsafe {
            xlib::XInitThreads();
            // The default handler exits the process on BadWindow and friends
            xlib::XSetErrorHandler(Some(record_x_error));
        });

        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display.is_null() {
            anyhow::bail!("Cannot open X display (is DISPLAY set?)");
        }

        let mut event_base = 0;
        let mut error_base = 0;
        let mut major = 0;
        let mut minor = 0;
        let has_xtest = unsafe {
            xtest::XTestQueryExtension(
                display,
                &mut event_base,
                &mut error_base,
                &mut major,
                &mut minor,
            )
        };
        if has_xtest == 0 {
            unsafe { xlib::XCloseDisplay(display) };
            anyhow::bail!("X server does not support the XTEST extension");
        }

        tracing::debug!("Opened X display with XTEST {}.{}", major, minor);
        Ok(Self {
            display: Mutex::new(DisplayHandle(display)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, DisplayHandle>> {
        self.display
            .lock()
            .map_err(|_| anyhow::anyhow!("X display lock poisoned"))
    }

    fn fake_button(&self, button: c_uint) -> Result<()> {
        let guard = self.lock()?;
        let display = guard.0;
        unsafe {
            xtest::XTestFakeButtonEvent(display, button, xlib::True, 0);
            xtest::XTestFakeButtonEvent(display, button, xlib::False, 0);
            xlib::XFlush(display);
        }
        Ok(())
    }

    fn tap_keysym(&self, keysym: xlib::KeySym) -> Result<()> {
        let guard = self.lock()?;
        let display = guard.0;
        unsafe {
            let (keycode, remapped) = keycode_for(display, keysym)?;
            let shifted = !remapped && needs_shift(display, keycode, keysym);
            let shift = xlib::XKeysymToKeycode(display, XK_SHIFT_L);

            if shifted {
                xtest::XTestFakeKeyEvent(display, c_uint::from(shift), xlib::True, 0);
            }
            xtest::XTestFakeKeyEvent(display, c_uint::from(keycode), xlib::True, 0);
            xtest::XTestFakeKeyEvent(display, c_uint::from(keycode), xlib::False, 0);
            if shifted {
                xtest::XTestFakeKeyEvent(display, c_uint::from(shift), xlib::False, 0);
            }
            xlib::XSync(display, xlib::False);

            if remapped {
                restore_scratch_keycode(display, keycode);
            }
        }
        Ok(())
    }

    fn intern_atom(display: *mut xlib::Display, name: &CStr) -> xlib::Atom {
        unsafe { xlib::XInternAtom(display, name.as_ptr(), xlib::False) }
    }

    fn send_wm_message(&self, window: u64, message: &CStr, data: [c_long; 2]) -> Result<()> {
        let guard = self.lock()?;
        let display = guard.0;
        unsafe {
            let root = xlib::XDefaultRootWindow(display);
            let message_type = Self::intern_atom(display, message);

            let mut payload = xlib::ClientMessageData::new();
            payload.set_long(0, data[0]);
            payload.set_long(1, data[1]);

            let message_event = xlib::XClientMessageEvent {
                type_: xlib::ClientMessage,
                serial: 0,
                send_event: xlib::True,
                display,
                window: window as xlib::Window,
                message_type,
                format: 32,
                data: payload,
            };
            let mut event = xlib::XEvent::from(message_event);

            LAST_X_ERROR.store(0, Ordering::SeqCst);
            let status = xlib::XSendEvent(
                display,
                root,
                xlib::False,
                xlib::SubstructureRedirectMask | xlib::SubstructureNotifyMask,
                &mut event,
            );
            xlib::XSync(display, xlib::False);

            if status == 0 {
                anyhow::bail!("XSendEvent failed for window 0x{:x}", window);
            }
            let error = LAST_X_ERROR.swap(0, Ordering::SeqCst);
            if error != 0 {
                anyhow::bail!("X error {} for window 0x{:x}", error, window);
            }
        }
        Ok(())
    }
}

impl Drop for LinuxController {
    fn drop(&mut self) {
        if let Ok(guard) = self.display.lock() {
            unsafe { xlib::XCloseDisplay(guard.0) };
        }
    }
}

#[async_trait]
impl PointerProbe for LinuxController {
    async fn screen_size(&self) -> Result<ScreenSize> {
        let guard = self.lock()?;
        let display = guard.0;
        let (width, height) = unsafe {
            let screen = xlib::XDefaultScreen(display);
            (
                xlib::XDisplayWidth(display, screen),
                xlib::XDisplayHeight(display, screen),
            )
        };
        Ok(ScreenSize {
            width: u32::try_from(width)?,
            height: u32::try_from(height)?,
        })
    }

    async fn pointer_position(&self) -> Result<Point> {
        let guard = self.lock()?;
        let display = guard.0;
        let mut root_return: xlib::Window = 0;
        let mut child_return: xlib::Window = 0;
        let (mut root_x, mut root_y, mut win_x, mut win_y) = (0, 0, 0, 0);
        let mut mask: c_uint = 0;

        let on_screen = unsafe {
            xlib::XQueryPointer(
                display,
                xlib::XDefaultRootWindow(display),
                &mut root_return,
                &mut child_return,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            )
        };
        if on_screen == 0 {
            anyhow::bail!("Pointer is not on the default screen");
        }
        Ok(Point::new(root_x, root_y))
    }
}

#[async_trait]
impl ComputerController for LinuxController {
    async fn move_pointer(&self, to: Point) -> Result<()> {
        let guard = self.lock()?;
        let display = guard.0;
        unsafe {
            xtest::XTestFakeMotionEvent(display, -1, to.x, to.y, 0);
            xlib::XFlush(display);
        }
        Ok(())
    }

    async fn click(&self, button: MouseButton, count: u32) -> Result<()> {
        let button = match button {
            MouseButton::Left => BUTTON_LEFT,
            MouseButton::Middle => BUTTON_MIDDLE,
            MouseButton::Right => BUTTON_RIGHT,
        };
        for i in 0..count {
            if i > 0 {
                tokio::time::sleep(CLICK_INTERVAL).await;
            }
            self.fake_button(button)?;
        }
        Ok(())
    }

    async fn scroll(&self, clicks: i32) -> Result<()> {
        let button = if clicks > 0 {
            BUTTON_SCROLL_UP
        } else {
            BUTTON_SCROLL_DOWN
        };
        for _ in 0..clicks.unsigned_abs() {
            self.fake_button(button)?;
        }
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        for ch in text.chars() {
            self.tap_keysym(char_keysym(ch))?;
            tokio::time::sleep(KEYSTROKE_INTERVAL).await;
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let keysym = lookup_keysym(key)?;
        self.tap_keysym(keysym)
    }

    async fn hotkey(&self, keys: &[String]) -> Result<()> {
        let keysyms = keys
            .iter()
            .map(|k| lookup_keysym(k))
            .collect::<Result<Vec<_>>>()?;

        let guard = self.lock()?;
        let display = guard.0;
        unsafe {
            let mut keycodes = Vec::with_capacity(keysyms.len());
            for keysym in keysyms {
                let keycode = xlib::XKeysymToKeycode(display, keysym);
                if keycode == 0 {
                    anyhow::bail!("No key mapped for keysym 0x{:x}", keysym);
                }
                keycodes.push(keycode);
            }
            for keycode in &keycodes {
                xtest::XTestFakeKeyEvent(display, c_uint::from(*keycode), xlib::True, 0);
            }
            for keycode in keycodes.iter().rev() {
                xtest::XTestFakeKeyEvent(display, c_uint::from(*keycode), xlib::False, 0);
            }
            xlib::XSync(display, xlib::False);
        }
        Ok(())
    }

    async fn take_screenshot(&self) -> Result<Vec<u8>> {
        let (width, height, rgb) = {
            let guard = self.lock()?;
            unsafe { capture_root(guard.0)? }
        };

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&rgb, width, height, ColorType::Rgb8)
            .context("Failed to encode screenshot as PNG")?;
        Ok(png)
    }

    async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let guard = self.lock()?;
        let display = guard.0;
        unsafe {
            let root = xlib::XDefaultRootWindow(display);
            let client_list = Self::intern_atom(display, c"_NET_CLIENT_LIST");
            let ids = window_property_ids(display, root, client_list)
                .context("Window manager does not publish _NET_CLIENT_LIST")?;

            Ok(ids
                .into_iter()
                .map(|id| WindowInfo {
                    id: u64::from(id),
                    title: window_title(display, id).unwrap_or_default(),
                })
                .collect())
        }
    }

    async fn focus_window(&self, id: u64) -> Result<()> {
        // Source indication 2: request from a pager, honoured without focus stealing checks
        self.send_wm_message(id, c"_NET_ACTIVE_WINDOW", [2, xlib::CurrentTime as c_long])
    }

    async fn close_window(&self, id: u64) -> Result<()> {
        self.send_wm_message(id, c"_NET_CLOSE_WINDOW", [xlib::CurrentTime as c_long, 2])
    }
}

/// Map a key name as models write it ("enter", "ctrl", "f5") to an X keysym name.
fn keysym_name(key: &str) -> String {
    let lower = key.to_lowercase();
    let name = match lower.as_str() {
        "enter" | "return" => "Return",
        "esc" | "escape" => "Escape",
        "tab" => "Tab",
        "backspace" => "BackSpace",
        "delete" | "del" => "Delete",
        "insert" => "Insert",
        "space" => "space",
        "up" => "Up",
        "down" => "Down",
        "left" => "Left",
        "right" => "Right",
        "home" => "Home",
        "end" => "End",
        "pageup" | "pgup" => "Prior",
        "pagedown" | "pgdn" => "Next",
        "ctrl" | "control" | "ctrlleft" => "Control_L",
        "ctrlright" => "Control_R",
        "alt" | "altleft" => "Alt_L",
        "altright" => "Alt_R",
        "shift" | "shiftleft" => "Shift_L",
        "shiftright" => "Shift_R",
        "win" | "winleft" | "super" | "cmd" | "command" | "meta" => "Super_L",
        "winright" => "Super_R",
        "capslock" => "Caps_Lock",
        "printscreen" | "prtsc" | "print" => "Print",
        "menu" | "apps" => "Menu",
        _ => {
            if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                if (1..=24).contains(&n) {
                    return format!("F{}", n);
                }
            }
            return key.to_string();
        }
    };
    name.to_string()
}

fn char_keysym(ch: char) -> xlib::KeySym {
    match ch {
        '\n' | '\r' => XK_RETURN,
        '\t' => XK_TAB,
        // Latin-1 keysyms equal their code points
        ' '..='~' | '\u{a0}'..='\u{ff}' => ch as xlib::KeySym,
        _ => 0x0100_0000 | ch as xlib::KeySym,
    }
}

fn lookup_keysym(key: &str) -> Result<xlib::KeySym> {
    let mut chars = key.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Ok(char_keysym(ch));
    }

    let name = CString::new(keysym_name(key))?;
    let keysym = unsafe { xlib::XStringToKeysym(name.as_ptr()) };
    if keysym == 0 {
        anyhow::bail!("Unknown key: {}", key);
    }
    Ok(keysym)
}

/// Find a keycode for `keysym`, temporarily binding a spare keycode when the
/// current layout has none. Returns whether the scratch keycode was used.
unsafe fn keycode_for(
    display: *mut xlib::Display,
    keysym: xlib::KeySym,
) -> Result<(xlib::KeyCode, bool)> {
    let keycode = xlib::XKeysymToKeycode(display, keysym);
    if keycode != 0 {
        return Ok((keycode, false));
    }

    let (mut min, mut max) = (0, 0);
    xlib::XDisplayKeycodes(display, &mut min, &mut max);
    let scratch = max;
    let mut mapping = [keysym, keysym];
    xlib::XChangeKeyboardMapping(display, scratch, 2, mapping.as_mut_ptr(), 1);
    xlib::XSync(display, xlib::False);

    let keycode = xlib::KeyCode::try_from(scratch)
        .map_err(|_| anyhow::anyhow!("No spare keycode for keysym 0x{:x}", keysym))?;
    Ok((keycode, true))
}

unsafe fn restore_scratch_keycode(display: *mut xlib::Display, keycode: xlib::KeyCode) {
    let mut empty: [xlib::KeySym; 2] = [0, 0];
    xlib::XChangeKeyboardMapping(display, c_int::from(keycode), 2, empty.as_mut_ptr(), 1);
    xlib::XSync(display, xlib::False);
}

unsafe fn needs_shift(
    display: *mut xlib::Display,
    keycode: xlib::KeyCode,
    keysym: xlib::KeySym,
) -> bool {
    #[allow(deprecated)]
    let (base, shifted) = (
        xlib::XKeycodeToKeysym(display, keycode, 0),
        xlib::XKeycodeToKeysym(display, keycode, 1),
    );
    base != keysym && shifted == keysym
}

unsafe fn capture_root(display: *mut xlib::Display) -> Result<(u32, u32, Vec<u8>)> {
    let root = xlib::XDefaultRootWindow(display);
    let screen = xlib::XDefaultScreen(display);
    let width = u32::try_from(xlib::XDisplayWidth(display, screen))?;
    let height = u32::try_from(xlib::XDisplayHeight(display, screen))?;

    let image = xlib::XGetImage(
        display,
        root,
        0,
        0,
        width,
        height,
        c_ulong::MAX,
        xlib::ZPixmap,
    );
    if image.is_null() {
        anyhow::bail!("XGetImage failed for the root window");
    }

    let (red_mask, green_mask, blue_mask) =
        ((*image).red_mask, (*image).green_mask, (*image).blue_mask);
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height as c_int {
        for x in 0..width as c_int {
            let pixel = xlib::XGetPixel(image, x, y);
            rgb.push(channel(pixel, red_mask));
            rgb.push(channel(pixel, green_mask));
            rgb.push(channel(pixel, blue_mask));
        }
    }
    xlib::XDestroyImage(image);

    Ok((width, height, rgb))
}

fn channel(pixel: c_ulong, mask: c_ulong) -> u8 {
    if mask == 0 {
        return 0;
    }
    let value = (pixel & mask) >> mask.trailing_zeros();
    let bits = (mask >> mask.trailing_zeros()).count_ones();
    if bits >= 8 {
        (value >> (bits - 8)) as u8
    } else {
        ((value * 255) / ((1 << bits) - 1)) as u8
    }
}

unsafe fn window_property_ids(
    display: *mut xlib::Display,
    window: xlib::Window,
    property: xlib::Atom,
) -> Result<Vec<xlib::Window>> {
    let mut actual_type: xlib::Atom = 0;
    let mut actual_format: c_int = 0;
    let mut nitems: c_ulong = 0;
    let mut bytes_after: c_ulong = 0;
    let mut data: *mut c_uchar = ptr::null_mut();

    let status = xlib::XGetWindowProperty(
        display,
        window,
        property,
        0,
        c_long::MAX,
        xlib::False,
        xlib::XA_WINDOW,
        &mut actual_type,
        &mut actual_format,
        &mut nitems,
        &mut bytes_after,
        &mut data,
    );
    if status != 0 || data.is_null() {
        anyhow::bail!("XGetWindowProperty failed");
    }

    // Format 32 properties are delivered as an array of C longs
    let ids = if actual_format == 32 {
        std::slice::from_raw_parts(data as *const c_ulong, nitems as usize).to_vec()
    } else {
        Vec::new()
    };
    xlib::XFree(data.cast());
    Ok(ids)
}

unsafe fn window_title(display: *mut xlib::Display, window: xlib::Window) -> Option<String> {
    let net_wm_name = LinuxController::intern_atom(display, c"_NET_WM_NAME");
    let utf8_string = LinuxController::intern_atom(display, c"UTF8_STRING");

    let mut actual_type: xlib::Atom = 0;
    let mut actual_format: c_int = 0;
    let mut nitems: c_ulong = 0;
    let mut bytes_after: c_ulong = 0;
    let mut data: *mut c_uchar = ptr::null_mut();

    let status = xlib::XGetWindowProperty(
        display,
        window,
        net_wm_name,
        0,
        1024,
        xlib::False,
        utf8_string,
        &mut actual_type,
        &mut actual_format,
        &mut nitems,
        &mut bytes_after,
        &mut data,
    );
    if status == 0 && !data.is_null() {
        let title = if actual_format == 8 && nitems > 0 {
            let bytes = std::slice::from_raw_parts(data, nitems as usize);
            Some(String::from_utf8_lossy(bytes).into_owned())
        } else {
            None
        };
        xlib::XFree(data.cast());
        if title.is_some() {
            return title;
        }
    }

    let mut name: *mut c_char = ptr::null_mut();
    if xlib::XFetchName(display, window, &mut name) != 0 && !name.is_null() {
        let title = CStr::from_ptr(name).to_string_lossy().into_owned();
        xlib::XFree(name.cast());
        return Some(title);
    }
    None
}
