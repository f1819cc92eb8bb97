use iced::color;
use iced::theme::Palette;
use iced::Theme;

/// Theme matching the system's light or dark mode at startup.
pub fn resolve_theme() -> Theme {
    let palette = if prefers_dark() {
        dark_palette()
    } else {
        light_palette()
    };
    Theme::custom("Whisper Transcriber", palette)
}

fn dark_palette() -> Palette {
    Palette {
        background: color!(0x1c, 0x1c, 0x1e),
        text: color!(0xcc, 0xcc, 0xcc),
        primary: color!(0x5e, 0x9f, 0xf5),
        success: color!(0x30, 0xd1, 0x58),
        warning: color!(0xff, 0xcc, 0x00),
        danger: color!(0xff, 0x45, 0x3a),
    }
}

fn light_palette() -> Palette {
    Palette {
        background: color!(0xf5, 0xf5, 0xf7),
        text: color!(0x1d, 0x1d, 0x1f),
        primary: color!(0x34, 0x78, 0xf6),
        success: color!(0x34, 0xc7, 0x59),
        warning: color!(0xff, 0x9f, 0x0a),
        danger: color!(0xff, 0x3b, 0x30),
    }
}

fn prefers_dark() -> bool {
    #[cfg(target_os = "macos")]
    {
        // Prints "Dark" in dark mode and fails when the key is absent (light mode).
        std::process::Command::new("defaults")
            .args(["read", "-g", "AppleInterfaceStyle"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(target_os = "macos"))]
    {
        std::env::var("GTK_THEME")
            .map(|name| name.to_ascii_lowercase().contains("dark"))
            .unwrap_or(true)
    }
}
