use gridframe_core::column::WidthPolicy;
use gridframe_core::window::VirtualWindow;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use unicode_width::UnicodeWidthChar;

/// Pixel-to-terminal-cell conversion base. Column widths in the engine
/// are pixels; one terminal cell stands in for 8px of column width.
pub const PX_PER_CELL: u32 = 8;

fn cells(px: u32) -> u16 {
    (px / PX_PER_CELL).clamp(3, 500) as u16
}

/// Resolves the visible columns' width policies into terminal cell
/// widths for a `total`-cell-wide grid. `MinMax` columns start at their
/// minimum and share any leftover space up to their maximum.
pub fn column_layout(total: u16, policies: &[WidthPolicy]) -> Vec<u16> {
    let mut widths: Vec<u16> = policies
        .iter()
        .map(|p| match p {
            WidthPolicy::Fixed(px) => cells(*px),
            WidthPolicy::MinMax(min, _) => cells(*min),
            WidthPolicy::Percent(pct) => {
                ((total as u32).saturating_mul(*pct as u32) / 100).max(3) as u16
            }
            WidthPolicy::Auto => 10,
        })
        .collect();
    let gaps = policies.len().saturating_sub(1) as u32;
    let used: u32 = widths.iter().map(|&w| w as u32).sum::<u32>() + gaps;
    let mut leftover = (total as u32).saturating_sub(used);
    while leftover > 0 {
        let mut grew = false;
        for (width, policy) in widths.iter_mut().zip(policies) {
            if leftover == 0 {
                break;
            }
            if let WidthPolicy::MinMax(_, max) = policy {
                if *width < cells(*max) {
                    *width += 1;
                    leftover -= 1;
                    grew = true;
                }
            }
        }
        if !grew {
            break;
        }
    }
    widths
}

/// Writes `input` at `(x, y)` clipped to `max_cols` terminal cells,
/// wide-character aware: a double-width glyph that would straddle the
/// clip edge is dropped rather than half-drawn.
pub fn render_str_clipped(
    x: u16,
    y: u16,
    max_cols: u16,
    buf: &mut Buffer,
    input: &str,
    style: Style,
) {
    if max_cols == 0 {
        return;
    }
    let max_cols = max_cols as usize;
    let mut out_cols = 0usize;
    let mut dx = 0u16;
    let mut tmp = [0u8; 4];

    for ch in input.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w == 0 {
            continue;
        }
        if out_cols + w > max_cols {
            return;
        }
        let s = ch.encode_utf8(&mut tmp);
        if let Some(cell) = buf.cell_mut((x + dx, y)) {
            cell.set_style(style);
            cell.set_symbol(s);
        }
        dx += 1;
        out_cols += 1;
        if w == 2 {
            if let Some(cell) = buf.cell_mut((x + dx, y)) {
                cell.set_style(style);
                cell.set_symbol("");
            }
            dx += 1;
            out_cols += 1;
        }
    }
}

/// Vertical scrollbar driven by the engine's window geometry.
pub fn render_scrollbar(area: Rect, buf: &mut Buffer, window: &VirtualWindow, style: Style) {
    buf.set_style(area, style);
    if area.height == 0 {
        return;
    }
    let content = window.total_extent();
    let viewport = window.viewport_height() as u64;
    if content <= viewport || content == 0 {
        for dy in 0..area.height {
            buf.set_stringn(area.x, area.y + dy, " ", 1, style);
        }
        return;
    }

    let track_h = area.height as f64;
    let thumb_h = ((viewport as f64 / content as f64) * track_h)
        .round()
        .clamp(1.0, track_h) as u16;
    let max_scroll = content.saturating_sub(viewport).max(1) as f64;
    let thumb_top = ((window.scroll_offset() as f64 / max_scroll) * (track_h - thumb_h as f64))
        .round()
        .clamp(0.0, (track_h - thumb_h as f64).max(0.0)) as u16;

    for dy in 0..area.height {
        let ch = if dy >= thumb_top && dy < thumb_top + thumb_h {
            "█"
        } else {
            " "
        };
        buf.set_stringn(area.x, area.y + dy, ch, 1, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_string(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .filter_map(|x| buf.cell((x, y)).map(|c| c.symbol().to_string()))
            .collect()
    }

    #[test]
    fn fixed_and_percent_columns_resolve() {
        let widths = column_layout(
            80,
            &[
                WidthPolicy::Fixed(120),
                WidthPolicy::Percent(25),
                WidthPolicy::Fixed(16),
            ],
        );
        assert_eq!(widths, vec![15, 20, 3]);
    }

    #[test]
    fn minmax_columns_absorb_leftover_space() {
        let widths = column_layout(40, &[WidthPolicy::Fixed(80), WidthPolicy::MinMax(40, 400)]);
        assert_eq!(widths[0], 10);
        // Grew past its 5-cell minimum but never past the total.
        assert!(widths[1] > 5);
        assert!(widths[0] as u32 + widths[1] as u32 + 1 <= 40);
    }

    #[test]
    fn clipping_respects_wide_chars() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 1));
        render_str_clipped(0, 0, 4, &mut buf, "日本語", Style::default());
        // Two double-width glyphs fit in four cells; the third is dropped.
        assert_eq!(row_string(&buf, 0, 10).trim_end(), "日本");
    }

    #[test]
    fn clipping_stops_at_max_cols() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 1));
        render_str_clipped(0, 0, 3, &mut buf, "abcdef", Style::default());
        assert_eq!(row_string(&buf, 0, 10).trim_end(), "abc");
    }
}
