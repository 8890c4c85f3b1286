//! End-to-end pointer selection scenarios over a [`TextSystem`] driven by
//! deterministic synthetic shaping and rasterization engines.

use glint_text::{
    LineMetrics, RasterizedGlyph, Rasterizer, ShapedGlyph, Shaper, TextHandle, TextSystem,
};

const ADVANCE: f32 = 10.0;

/// Monospace shaper: one glyph per codepoint, fixed advance, clusters at
/// the codepoint's byte offset.
struct MonoShaper;

impl Shaper for MonoShaper {
    fn shape(&mut self, text: &str) -> Vec<ShapedGlyph> {
        text.char_indices()
            .map(|(byte, c)| ShapedGlyph {
                glyph_id: c as u32,
                cluster: byte as u32,
                x_advance: ADVANCE,
                y_advance: 0.0,
                x_offset: 0.0,
                y_offset: 0.0,
            })
            .collect()
    }
}

/// 4x4 box bitmaps for everything except space
struct MonoRasterizer;

impl Rasterizer for MonoRasterizer {
    fn rasterize(&mut self, glyph_id: u32) -> glint_text::Result<RasterizedGlyph> {
        if glyph_id == ' ' as u32 {
            return Ok(RasterizedGlyph::default());
        }
        Ok(RasterizedGlyph {
            bitmap: vec![255; 16],
            width: 4,
            height: 4,
            bearing_x: 0,
            bearing_y: 4,
        })
    }
}

fn metrics() -> LineMetrics {
    LineMetrics {
        ascent: 8.0,
        descent: 2.0,
        line_gap: 0.0,
    }
}

fn system() -> TextSystem {
    TextSystem::with_engines(
        Box::new(MonoShaper),
        Box::new(MonoRasterizer),
        metrics(),
        256,
        256,
        64,
    )
}

fn make_text(system: &mut TextSystem, text: &str, x: f32, baseline_y: f32) -> TextHandle {
    let handle = system.create_text();
    system.set_text(handle, text);
    system.set_position(handle, x, baseline_y);
    handle
}

#[test]
fn caret_table_for_two_characters() {
    let mut sys = system();
    let h = make_text(&mut sys, "AB", 0.0, 50.0);
    sys.update();

    let caret_x = &sys.get(h).unwrap().geometry.caret_x;
    assert_eq!(caret_x.len(), 3);
    assert_eq!(caret_x[0], 0.0);
    assert!(caret_x[0] < caret_x[1] && caret_x[1] < caret_x[2]);
}

#[test]
fn selection_info_round_trip_without_selection() {
    let mut sys = system();
    let h = make_text(&mut sys, "abc", 100.0, 50.0);
    sys.update();

    let info = sys.selection_info(h);
    assert!(info.valid);
    assert!(!info.has_selection);
    assert_eq!(info.bounds, [100.0, 42.0, 130.0, 52.0]);
}

#[test]
fn drag_right_produces_selection() {
    let mut sys = system();
    let h = make_text(&mut sys, "hello", 100.0, 50.0);
    sys.update();

    // Press inside the line box, drag two characters to the right.
    sys.begin_selection(h, 101.0, 50.0);
    sys.update_selection(h, 121.0, 50.0);
    sys.end_selection(h);

    let info = sys.selection_info(h);
    assert!(info.has_selection);
    assert!(info.sel_x1 > info.sel_x0);
    assert_eq!(info.sel_x0, 100.0);
    assert_eq!(info.sel_x1, 120.0);
    // The line box bounds the selection rectangle vertically.
    assert_eq!(info.sel_y0, 42.0);
    assert_eq!(info.sel_y1, 52.0);
}

#[test]
fn drag_left_orders_selection_endpoints() {
    let mut sys = system();
    let h = make_text(&mut sys, "hello", 0.0, 50.0);
    sys.update();

    sys.begin_selection(h, 40.0, 50.0);
    sys.update_selection(h, 10.0, 50.0);
    sys.end_selection(h);

    let info = sys.selection_info(h);
    assert!(info.has_selection);
    assert_eq!(info.sel_x0, 10.0);
    assert_eq!(info.sel_x1, 40.0);
    // Anchor stays where the drag began.
    assert_eq!(info.sel_a, 4);
    assert_eq!(info.sel_b, 1);
    assert_eq!(info.caret, 1);
}

#[test]
fn update_selection_requires_begin() {
    let mut sys = system();
    let h = make_text(&mut sys, "hello", 0.0, 50.0);
    sys.update();

    sys.update_selection(h, 30.0, 50.0);
    assert!(!sys.selection_info(h).has_selection);

    // After the drag ends, move events no longer change the selection.
    sys.begin_selection(h, 1.0, 50.0);
    sys.update_selection(h, 30.0, 50.0);
    sys.end_selection(h);
    sys.update_selection(h, 50.0, 50.0);
    let info = sys.selection_info(h);
    assert_eq!(info.sel_b, 3);
}

#[test]
fn drag_may_leave_the_line_box_vertically() {
    let mut sys = system();
    let h = make_text(&mut sys, "hello", 0.0, 50.0);
    sys.update();

    sys.begin_selection(h, 1.0, 50.0);
    // Way below the text; the y-agnostic caret still tracks x.
    sys.update_selection(h, 35.0, 400.0);
    assert!(sys.selection_info(h).has_selection);

    // Beginning a new selection outside the band is rejected and leaves
    // the previous endpoints alone.
    sys.begin_selection(h, 1.0, 400.0);
    let info = sys.selection_info(h);
    assert_eq!(info.sel_a, 0);
    assert_eq!(info.sel_b, 3);
}

#[test]
fn hit_test_misses_outside_every_object() {
    let mut sys = system();
    make_text(&mut sys, "hello", 100.0, 50.0);
    sys.update();

    assert_eq!(sys.hit_test(0.0, 0.0), TextHandle::INVALID);
    assert_eq!(sys.hit_test(125.0, 200.0), TextHandle::INVALID);
}

#[test]
fn hit_test_finds_object_and_prefers_later_created() {
    let mut sys = system();
    let a = make_text(&mut sys, "aaaa", 0.0, 50.0);
    let b = make_text(&mut sys, "bbbb", 20.0, 50.0);
    sys.update();

    // Point only inside `a`.
    assert_eq!(sys.hit_test(5.0, 50.0), a);
    // Overlap: the later-created object wins.
    assert_eq!(sys.hit_test(25.0, 50.0), b);
}

#[test]
fn hit_test_skips_unselectable_and_unshaped() {
    let mut sys = system();
    let a = make_text(&mut sys, "aaaa", 0.0, 50.0);
    sys.update();
    sys.set_selectable(a, false);
    assert_eq!(sys.hit_test(5.0, 50.0), TextHandle::INVALID);

    // Not yet shaped: no caret table, no hit.
    let b = make_text(&mut sys, "bbbb", 0.0, 100.0);
    assert_eq!(sys.hit_test(5.0, 100.0), TextHandle::INVALID);
    sys.update();
    assert_eq!(sys.hit_test(5.0, 100.0), b);
}

#[test]
fn stale_handle_operations_are_noops() {
    let mut sys = system();
    let h = make_text(&mut sys, "abc", 0.0, 50.0);
    sys.update();
    sys.destroy_text(h);

    // All of these silently do nothing.
    sys.set_text(h, "zzz");
    sys.set_position(h, 9.0, 9.0);
    sys.set_color(h, [1.0, 0.0, 0.0, 1.0]);
    sys.begin_selection(h, 1.0, 50.0);
    assert!(sys.get(h).is_none());
    assert!(!sys.selection_info(h).valid);

    // The slot is reused and the new handle works normally.
    let h2 = sys.create_text();
    assert_eq!(h2.index(), h.index());
    sys.set_text(h2, "new");
    sys.set_position(h2, 0.0, 50.0);
    sys.update();
    assert_eq!(sys.get(h2).unwrap().geometry.caret_x.len(), 4);
    assert!(sys.get(h).is_none());
}

#[test]
fn glyph_cache_exhaustion_degrades_to_gaps() {
    // Capacity 1: only the first distinct glyph gets cached.
    let mut sys = TextSystem::with_engines(
        Box::new(MonoShaper),
        Box::new(MonoRasterizer),
        metrics(),
        256,
        256,
        1,
    );
    let h = make_text(&mut sys, "ab", 0.0, 50.0);
    sys.update();

    let obj = sys.get(h).unwrap();
    // One quad drawn, one skipped; carets cover both characters.
    assert_eq!(obj.geometry.vertices.len(), 6);
    assert_eq!(obj.geometry.caret_x.len(), 3);
    assert_eq!(obj.geometry.width(), 2.0 * ADVANCE);
    assert_eq!(sys.glyph_cache().len(), 1);
}

#[test]
fn space_contributes_advance_but_no_quad() {
    let mut sys = system();
    let h = make_text(&mut sys, "a b", 0.0, 50.0);
    sys.update();

    let obj = sys.get(h).unwrap();
    assert_eq!(obj.geometry.vertices.len(), 12);
    assert_eq!(obj.geometry.width(), 3.0 * ADVANCE);
}

#[test]
fn rebuild_happens_once_per_update() {
    let mut sys = system();
    let h = make_text(&mut sys, "aa", 0.0, 50.0);
    sys.update();
    let count_after_first = sys.glyph_cache().rasterization_count();
    assert_eq!(count_after_first, 1);

    // No edits: update does not reshape or re-rasterize.
    sys.update();
    assert_eq!(sys.glyph_cache().rasterization_count(), count_after_first);

    // Editing reshapes, but cached glyphs stay cached.
    sys.set_text(h, "aaaa");
    sys.update();
    assert_eq!(sys.glyph_cache().rasterization_count(), count_after_first);
}

#[test]
fn clear_resets_objects_and_caches() {
    let mut sys = system();
    let h = make_text(&mut sys, "abc", 0.0, 50.0);
    sys.update();
    assert!(sys.atlas().is_dirty());

    sys.clear();
    assert!(sys.get(h).is_none());
    assert_eq!(sys.glyph_cache().len(), 0);
    assert!(sys.atlas().pixels().iter().all(|&p| p == 0));
}
