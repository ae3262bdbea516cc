//! Texture recipes for every tier.
//!
//! Primary recipes layer shapes, outlines and gradients. A gradient that the
//! canvas refuses degrades to a flat fill for that one call; any other
//! refused primitive fails the whole drawing so the Fallback tier can run.
//! Fallback recipes only use flat rectangles and circles.

use tracing::{debug, warn};

use crate::canvas::{rgb, Canvas, CanvasError, Color, ColorStop};
use crate::manifest::keys;

use super::SynthesisFailure;

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

const SKY_TOP: Color = rgb(0x1e90ff);
const SKY_BOTTOM: Color = rgb(0x87ceeb);
const CLOUD: Color = rgb(0xffffff);
const DIRT: Color = rgb(0x8b4513);
const DIRT_DARK: Color = rgb(0x654321);
const GRASS: Color = rgb(0x228b22);
const GOLD: Color = rgb(0xffd700);
const GOLD_SHINE: Color = rgb(0xfffacd);
const GOLD_RIM: Color = rgb(0xdaa520);
const ROCK: Color = rgb(0x808080);
const ROCK_DARK: Color = rgb(0x696969);
const BLUE: Color = rgb(0x3498db);
const BLUE_DARK: Color = rgb(0x2980b9);
const SKIN: Color = rgb(0xf1c40f);
const TROUSERS: Color = rgb(0x2c3e50);
const WHITE: Color = rgb(0xffffff);
const BLACK: Color = rgb(0x000000);
const GRID: Color = rgb(0x222222);
const NEUTRAL: Color = rgb(0x808080);

/// Single colour used by the Emergency tier.
pub fn emergency_color(key: &str) -> Color {
    match key {
        keys::BACKGROUND => SKY_BOTTOM,
        keys::GROUND => DIRT,
        keys::PLAYER => BLUE,
        _ => NEUTRAL,
    }
}

// ---------------------------------------------------------------------------
// Primary
// ---------------------------------------------------------------------------

/// Draw the full-detail version of `key`.
pub fn draw_primary(key: &str, canvas: &mut Canvas) -> Result<(), SynthesisFailure> {
    match key {
        keys::LOGO => logo(canvas)?,
        keys::BACKGROUND => background(canvas),
        keys::LOADING_BACKGROUND => loading_background(canvas)?,
        keys::GROUND => ground(canvas),
        keys::PLATFORM => platform(canvas)?,
        keys::COIN => coin(canvas)?,
        keys::OBSTACLE => obstacle(canvas)?,
        keys::PLAYER => player(canvas, Pose::STANDING),
        keys::PLAYER_LEFT => player(canvas, Pose::LEFT),
        keys::PLAYER_RIGHT => player(canvas, Pose::RIGHT),
        keys::LOADING_BAR_BG => loading_bar(canvas, WHITE),
        keys::LOADING_BAR => loading_bar(canvas, BLUE),
        other => return Err(SynthesisFailure::NoRecipe(other.into())),
    }
    Ok(())
}

/// Fill a rectangle with a gradient, or with `flat` when gradients are
/// unavailable. Only this call degrades.
fn gradient_or_flat(
    canvas: &mut Canvas,
    start: (f32, f32),
    end: (f32, f32),
    stops: &[ColorStop],
    flat: Color,
    rect: (i32, i32, i32, i32),
) {
    let (x, y, w, h) = rect;
    match canvas.linear_gradient(start, end, stops) {
        Ok(gradient) => canvas.fill_rect_gradient(&gradient, x, y, w, h),
        Err(e) => {
            debug!(error = %e, "gradient unavailable, using flat fill");
            canvas.set_fill(flat).fill_rect(x, y, w, h);
        }
    }
}

fn logo(canvas: &mut Canvas) -> Result<(), CanvasError> {
    canvas.set_fill(BLUE).fill_rect(0, 0, 200, 100);
    canvas.stroke_rect(0, 0, 200, 100, 4, BLUE_DARK)?;
    canvas.set_fill(WHITE).fill_rect(50, 40, 100, 30);
    Ok(())
}

fn clouds(canvas: &mut Canvas) {
    canvas.set_fill(CLOUD);
    for (cx, cy, r) in [
        (100.0, 80.0, 30.0),
        (130.0, 80.0, 40.0),
        (160.0, 80.0, 30.0),
        (600.0, 120.0, 40.0),
        (640.0, 120.0, 50.0),
        (680.0, 120.0, 40.0),
    ] {
        canvas.fill_circle(cx, cy, r);
    }
}

fn background(canvas: &mut Canvas) {
    let stops = [
        ColorStop {
            offset: 0.0,
            color: SKY_TOP,
        },
        ColorStop {
            offset: 1.0,
            color: SKY_BOTTOM,
        },
    ];
    gradient_or_flat(canvas, (0.0, 0.0), (0.0, 450.0), &stops, SKY_TOP, (0, 0, 800, 450));
    clouds(canvas);
}

fn loading_background(canvas: &mut Canvas) -> Result<(), CanvasError> {
    canvas.set_fill(BLACK).fill_rect(0, 0, 800, 450);
    for x in (0..800).step_by(20) {
        canvas.line(x, 0, x, 449, GRID)?;
    }
    for y in (0..450).step_by(20) {
        canvas.line(0, y, 799, y, GRID)?;
    }
    Ok(())
}

fn ground(canvas: &mut Canvas) {
    canvas.set_fill(DIRT).fill_rect(0, 0, 64, 32);
    canvas.set_fill(GRASS).fill_rect(0, 0, 64, 8);
    canvas.set_fill(DIRT_DARK);
    canvas.fill_rect(10, 12, 5, 5);
    canvas.fill_rect(40, 18, 8, 4);
    canvas.fill_rect(20, 22, 6, 6);
}

fn platform(canvas: &mut Canvas) -> Result<(), CanvasError> {
    canvas.set_fill(DIRT).fill_rect(0, 0, 200, 32);
    canvas.set_fill(GRASS).fill_rect(0, 0, 200, 8);
    canvas.stroke_rect(0, 0, 200, 32, 2, DIRT_DARK)
}

fn coin(canvas: &mut Canvas) -> Result<(), CanvasError> {
    canvas.set_fill(GOLD).fill_circle(16.0, 16.0, 14.0);
    canvas.set_fill(GOLD_SHINE).fill_circle(10.0, 10.0, 4.0);
    canvas.stroke_circle(16.0, 16.0, 14.0, 2.0, GOLD_RIM)
}

fn obstacle(canvas: &mut Canvas) -> Result<(), CanvasError> {
    canvas.set_fill(ROCK).fill_rect(4, 8, 24, 24);
    canvas.set_fill(ROCK_DARK);
    canvas.fill_triangle((0.0, 16.0), (8.0, 0.0), (16.0, 16.0))?;
    canvas.fill_triangle((16.0, 16.0), (24.0, 0.0), (32.0, 16.0))
}

#[derive(Debug, Clone, Copy)]
struct Pose {
    facing_left: bool,
    moving: bool,
}

impl Pose {
    const STANDING: Pose = Pose {
        facing_left: false,
        moving: false,
    };
    const LEFT: Pose = Pose {
        facing_left: true,
        moving: true,
    };
    const RIGHT: Pose = Pose {
        facing_left: false,
        moving: true,
    };
}

fn player(canvas: &mut Canvas, pose: Pose) {
    canvas.set_fill(BLUE).fill_rect(8, 8, 16, 24);
    canvas.set_fill(SKIN).fill_rect(8, 0, 16, 8);

    let eye_x = if pose.facing_left { 10 } else { 18 };
    let pupil_x = if pose.facing_left { 10 } else { 20 };
    canvas.set_fill(WHITE).fill_rect(eye_x, 2, 4, 4);
    canvas.set_fill(BLACK).fill_rect(pupil_x, 3, 2, 2);

    // Moving poses lift the front leg.
    canvas.set_fill(TROUSERS);
    canvas.fill_rect(8, 32, 6, if pose.moving { 12 } else { 16 });
    canvas.fill_rect(18, 32, 6, 16);

    let arm_x = if pose.facing_left { 4 } else { 24 };
    canvas.set_fill(BLUE).fill_rect(arm_x, 12, 4, 16);
}

fn loading_bar(canvas: &mut Canvas, color: Color) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    canvas.set_fill(color).fill_rect(0, 0, w, h);
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Draw the flat version of `key`.
pub fn draw_fallback(key: &str, canvas: &mut Canvas) -> Result<(), SynthesisFailure> {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    match key {
        keys::LOGO => {
            canvas.set_fill(BLUE).fill_rect(0, 0, w, h);
            canvas.set_fill(WHITE).fill_rect(50, 40, 100, 30);
        }
        keys::BACKGROUND => {
            canvas.set_fill(SKY_BOTTOM).fill_rect(0, 0, w, h);
            clouds(canvas);
        }
        keys::LOADING_BACKGROUND => canvas.set_fill(BLACK).fill_rect(0, 0, w, h),
        keys::GROUND => ground(canvas),
        keys::PLATFORM => {
            canvas.set_fill(DIRT).fill_rect(0, 0, w, h);
            canvas.set_fill(GRASS).fill_rect(0, 0, w, 8);
        }
        keys::COIN => {
            canvas.set_fill(GOLD).fill_circle(16.0, 16.0, 14.0);
        }
        keys::OBSTACLE => canvas.set_fill(ROCK).fill_rect(0, 0, w, h),
        keys::PLAYER | keys::PLAYER_LEFT | keys::PLAYER_RIGHT => {
            canvas.set_fill(BLUE).fill_rect(0, 0, w, h);
        }
        keys::LOADING_BAR_BG => loading_bar(canvas, WHITE),
        keys::LOADING_BAR => loading_bar(canvas, BLUE),
        other => {
            warn!(key = other, "no flat recipe for texture");
            return Err(SynthesisFailure::NoRecipe(other.into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Capabilities;

    fn canvas(w: u32, h: u32, caps: Capabilities) -> Canvas {
        Canvas::new(w, h, caps).unwrap()
    }

    #[test]
    fn background_degrades_gradient_to_flat_sky() {
        let mut full = canvas(800, 450, Capabilities::FULL);
        draw_primary(keys::BACKGROUND, &mut full).unwrap();
        let mut flat = canvas(
            800,
            450,
            Capabilities {
                gradients: false,
                ..Capabilities::FULL
            },
        );
        draw_primary(keys::BACKGROUND, &mut flat).unwrap();

        // Bottom-left corner is clear of clouds in both.
        assert_eq!(flat.pixel(0, 449), Some(SKY_TOP));
        assert_ne!(full.pixel(0, 449), Some(SKY_TOP));
        // Clouds are drawn either way.
        assert_eq!(flat.pixel(130, 80), Some(CLOUD));
        assert_eq!(full.pixel(130, 80), Some(CLOUD));
    }

    #[test]
    fn stroked_recipes_fail_without_strokes() {
        let caps = Capabilities {
            strokes: false,
            ..Capabilities::FULL
        };
        for key in [keys::LOGO, keys::PLATFORM, keys::COIN, keys::LOADING_BACKGROUND] {
            let mut c = canvas(800, 450, caps);
            assert!(
                matches!(
                    draw_primary(key, &mut c),
                    Err(SynthesisFailure::Canvas(CanvasError::Unsupported("stroke")))
                ),
                "{key} should need strokes"
            );
        }
    }

    #[test]
    fn obstacle_needs_paths() {
        let mut c = canvas(
            32,
            32,
            Capabilities {
                paths: false,
                ..Capabilities::FULL
            },
        );
        assert!(draw_primary(keys::OBSTACLE, &mut c).is_err());
    }

    #[test]
    fn fallback_recipes_work_on_flat_canvas() {
        for key in [
            keys::LOGO,
            keys::BACKGROUND,
            keys::LOADING_BACKGROUND,
            keys::GROUND,
            keys::PLATFORM,
            keys::COIN,
            keys::OBSTACLE,
            keys::PLAYER,
            keys::PLAYER_LEFT,
            keys::PLAYER_RIGHT,
            keys::LOADING_BAR_BG,
            keys::LOADING_BAR,
        ] {
            let mut c = canvas(64, 64, Capabilities::FLAT_ONLY);
            assert!(draw_fallback(key, &mut c).is_ok(), "{key} fallback failed");
        }
    }

    #[test]
    fn player_poses_differ_by_facing() {
        let mut left = canvas(32, 48, Capabilities::FULL);
        let mut right = canvas(32, 48, Capabilities::FULL);
        draw_primary(keys::PLAYER_LEFT, &mut left).unwrap();
        draw_primary(keys::PLAYER_RIGHT, &mut right).unwrap();
        assert_eq!(left.pixel(5, 20), Some(BLUE), "left arm");
        assert_eq!(right.pixel(25, 20), Some(BLUE), "right arm");
        assert_ne!(left.pixel(25, 20), Some(BLUE));
    }

    #[test]
    fn unknown_keys_have_no_recipe() {
        let mut c = canvas(8, 8, Capabilities::FULL);
        assert!(matches!(
            draw_primary("mystery", &mut c),
            Err(SynthesisFailure::NoRecipe(_))
        ));
        assert!(matches!(
            draw_fallback("mystery", &mut c),
            Err(SynthesisFailure::NoRecipe(_))
        ));
    }

    #[test]
    fn emergency_palette() {
        assert_eq!(emergency_color(keys::BACKGROUND), rgb(0x87ceeb));
        assert_eq!(emergency_color(keys::GROUND), rgb(0x8b4513));
        assert_eq!(emergency_color(keys::PLAYER), rgb(0x3498db));
    }
}
