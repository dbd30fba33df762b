//! Angle-based 2D helpers. Angles are degrees, counter-clockwise, with the
//! y axis pointing down the screen.

#[inline]
pub fn sqr(x: f32) -> f32 {
    x * x
}

#[inline]
pub fn dsin(deg: f32) -> f32 {
    deg.to_radians().sin()
}

#[inline]
pub fn dcos(deg: f32) -> f32 {
    deg.to_radians().cos()
}

pub fn lengthdir_x(len: f32, dir: f32) -> f32 {
    len * dcos(dir)
}

pub fn lengthdir_y(len: f32, dir: f32) -> f32 {
    -len * dsin(dir)
}

pub fn point_distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    (sqr(x2 - x1) + sqr(y2 - y1)).sqrt()
}

/// Heading from (x1, y1) towards (x2, y2).
pub fn point_direction(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    (y1 - y2).atan2(x2 - x1).to_degrees()
}

pub fn lerp(a: f32, b: f32, f: f32) -> f32 {
    a + (b - a) * f
}

/// Step `start` towards `end` by at most `shift`.
pub fn approach(start: f32, end: f32, shift: f32) -> f32 {
    start + (end - start).clamp(-shift, shift)
}

/// Wrap into `[0, 360)`.
pub fn angle_wrap(deg: f32) -> f32 {
    let wrapped = deg % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Signed shortest turn from `src` to `dest`, in `[-180, 180)`.
pub fn angle_difference(dest: f32, src: f32) -> f32 {
    angle_wrap(dest - src + 180.0) - 180.0
}

pub fn circle_vs_circle(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
    sqr(x2 - x1) + sqr(y2 - y1) < sqr(r1 + r2)
}

/// Circle against a `w` x `h` rectangle centred on (`rx`, `ry`) and rotated
/// by `dir` degrees. `h` runs along the heading.
pub fn circle_vs_rotated_rect(
    cx: f32,
    cy: f32,
    cr: f32,
    rx: f32,
    ry: f32,
    w: f32,
    h: f32,
    dir: f32,
) -> bool {
    let dx = cx - rx;
    let dy = cy - ry;

    let s = dsin(dir);
    let c = dcos(dir);
    let local_x = dx * s + dy * c;
    let local_y = dx * c - dy * s;

    let near_x = local_x.clamp(-w / 2.0, w / 2.0);
    let near_y = local_y.clamp(-h / 2.0, h / 2.0);

    sqr(local_x - near_x) + sqr(local_y - near_y) < sqr(cr)
}

/// Advance a heading-driven body: move along `dir`, then accelerate.
/// Speed never drops below zero.
pub fn advance(x: &mut f32, y: &mut f32, spd: &mut f32, dir: f32, acc: f32, delta: f32) {
    *x += lengthdir_x(*spd, dir) * delta;
    *y += lengthdir_y(*spd, dir) * delta;
    *spd = (*spd + acc * delta).max(0.0);
}

/// Normalized (x, y) of a raw direction pair, or zero when idle.
pub fn normalize(x: f32, y: f32) -> (f32, f32) {
    let len = (x * x + y * y).sqrt();
    if len == 0.0 {
        (0.0, 0.0)
    } else {
        (x / len, y / len)
    }
}
