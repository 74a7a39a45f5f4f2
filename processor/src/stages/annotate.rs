use imageproc::drawing::{draw_filled_rect_mut, BresenhamLineIter, Canvas};
use imageproc::point::Point;
use imageproc::rect::Rect;

use super::contours::ContourSet;

/// Outline every contour as a closed polyline `thickness` px wide.
pub fn draw_contours<C: Canvas>(
    canvas: &mut C,
    contours: &ContourSet,
    color: C::Pixel,
    thickness: u32,
) {
    for contour in contours.iter() {
        draw_closed_polyline(canvas, &contour.points, color, thickness);
    }
}

/// Frame every contour's bounding rectangle with a `thickness` px stroke.
pub fn draw_bounding_boxes<C: Canvas>(
    canvas: &mut C,
    contours: &ContourSet,
    color: C::Pixel,
    thickness: u32,
) {
    for rect in contours.bounding_rects() {
        draw_rect_outline(canvas, rect, color, thickness);
    }
}

fn draw_rect_outline<C: Canvas>(canvas: &mut C, rect: Rect, color: C::Pixel, thickness: u32) {
    let corners = [
        Point::new(rect.left(), rect.top()),
        Point::new(rect.right(), rect.top()),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.left(), rect.bottom()),
    ];
    draw_closed_polyline(canvas, &corners, color, thickness);
}

fn draw_closed_polyline<C: Canvas>(
    canvas: &mut C,
    points: &[Point<i32>],
    color: C::Pixel,
    thickness: u32,
) {
    match points {
        [] => {}
        [only] => stamp(canvas, only.x, only.y, color, thickness),
        _ => {
            let closing = points.last().zip(points.first());
            for (from, to) in points.windows(2).map(|w| (&w[0], &w[1])).chain(closing) {
                draw_thick_segment(canvas, *from, *to, color, thickness);
            }
        }
    }
}

fn draw_thick_segment<C: Canvas>(
    canvas: &mut C,
    from: Point<i32>,
    to: Point<i32>,
    color: C::Pixel,
    thickness: u32,
) {
    if from == to {
        stamp(canvas, from.x, from.y, color, thickness);
        return;
    }
    let line = BresenhamLineIter::new((from.x as f32, from.y as f32), (to.x as f32, to.y as f32));
    for (x, y) in line {
        stamp(canvas, x, y, color, thickness);
    }
}

/// Paint a `thickness`-sided square centred on (x, y), clipped to the canvas.
/// Strokes are never thinner than one pixel.
fn stamp<C: Canvas>(canvas: &mut C, x: i32, y: i32, color: C::Pixel, thickness: u32) {
    let thickness = thickness.max(1);
    let half = (thickness / 2) as i32;
    let square = Rect::at(x - half, y - half).of_size(thickness, thickness);
    draw_filled_rect_mut(canvas, square, color);
}
