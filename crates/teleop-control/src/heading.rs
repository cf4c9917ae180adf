//! 航向状态
//!
//! 累积偏航角（度），只由转向动作修改，不做 [0, 360) 归一化。
//!
//! 内部以纳度（1e-9 度）定点整数保存，保证：
//! - `turned_right(d).turned_left(d)` 精确还原
//! - 72 次 `turned_right(5)` 精确等于 360
//!
//! 限制：
//! - 分辨率 1e-9 度，转角先四舍五入到纳度；绝对值小于 5e-10 度的转角不改变航向
//! - 范围约 ±1.7e29 度（`i128` 纳度），超出时饱和；饱和后的往返不再精确
//! - NaN 转角按 0 处理，±inf 饱和到范围端点
//!
//! 精确往返只在起点与转角都处于范围内、且中间结果未饱和时成立。

use nalgebra::{Rotation2, Vector2};

const NANODEGREES_PER_DEGREE: f64 = 1e9;

/// 平移动作相对机头的名义方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
}

/// 累积航向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Heading {
    nanodegrees: i128,
}

impl Heading {
    pub const ZERO: Self = Self { nanodegrees: 0 };

    pub fn from_degrees(degrees: f64) -> Self {
        Self {
            nanodegrees: to_nanodegrees(degrees),
        }
    }

    pub fn degrees(self) -> f64 {
        self.nanodegrees as f64 / NANODEGREES_PER_DEGREE
    }

    pub fn radians(self) -> f64 {
        self.degrees().to_radians()
    }

    /// 顺时针转 `degrees`
    #[must_use]
    pub fn turned_right(self, degrees: f64) -> Self {
        Self {
            nanodegrees: self.nanodegrees.saturating_add(to_nanodegrees(degrees)),
        }
    }

    /// 逆时针转 `degrees`
    #[must_use]
    pub fn turned_left(self, degrees: f64) -> Self {
        Self {
            nanodegrees: self.nanodegrees.saturating_sub(to_nanodegrees(degrees)),
        }
    }

    /// 机头方向的单位向量（世界坐标系 x/y）
    pub fn facing(self) -> Vector2<f64> {
        Rotation2::new(self.radians()) * Vector2::x()
    }

    /// 将机体方向的平移按当前航向旋转到世界坐标系，并乘以速率
    ///
    /// - Forward：`(cos h, sin h)`
    /// - Right：Forward 旋转 +90°，即 `(-sin h, cos h)`
    /// - Back / Left：分别为 Forward / Right 取反
    pub fn horizontal_velocity(self, direction: Direction, speed: f64) -> Vector2<f64> {
        let f = self.facing();
        let unit = match direction {
            Direction::Forward => f,
            Direction::Back => -f,
            Direction::Right => Vector2::new(-f.y, f.x),
            Direction::Left => Vector2::new(f.y, -f.x),
        };
        unit * speed
    }
}

impl std::fmt::Display for Heading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

// 四舍五入到纳度；NaN 为 0，超出 i128 的值（含 ±inf）饱和
fn to_nanodegrees(degrees: f64) -> i128 {
    (degrees * NANODEGREES_PER_DEGREE).round() as i128
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_no_wraparound() {
        let mut heading = Heading::ZERO;
        for _ in 0..72 {
            heading = heading.turned_right(5.0);
        }
        assert_eq!(heading.degrees(), 360.0);

        for _ in 0..144 {
            heading = heading.turned_left(5.0);
        }
        assert_eq!(heading.degrees(), -360.0);
    }

    #[test]
    fn test_forward_at_zero_and_ninety() {
        let v = Heading::ZERO.horizontal_velocity(Direction::Forward, 5.0);
        assert_relative_eq!(v.x, 5.0);
        assert_relative_eq!(v.y, 0.0);

        let v = Heading::from_degrees(90.0).horizontal_velocity(Direction::Forward, 5.0);
        assert!(v.x.abs() < 1e-9);
        assert_relative_eq!(v.y, 5.0);
    }

    #[test]
    fn test_right_is_quarter_turn_clockwise() {
        // NED：航向 0 朝北，右侧为东（+y）
        let v = Heading::ZERO.horizontal_velocity(Direction::Right, 5.0);
        assert!(v.x.abs() < 1e-9);
        assert_relative_eq!(v.y, 5.0);

        // 朝东时右侧为南（-x）
        let v = Heading::from_degrees(90.0).horizontal_velocity(Direction::Right, 5.0);
        assert_relative_eq!(v.x, -5.0);
        assert!(v.y.abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_input() {
        assert_eq!(Heading::ZERO.turned_right(f64::NAN), Heading::ZERO);
        assert!(Heading::ZERO.turned_right(f64::INFINITY).degrees() > 1e20);
    }

    #[test]
    fn test_sub_resolution_turn_is_dropped() {
        assert_eq!(Heading::ZERO.turned_right(1e-10), Heading::ZERO);
        assert_eq!(Heading::ZERO.turned_right(4e-10), Heading::ZERO);
        assert_eq!(Heading::ZERO.turned_right(1e-9).degrees(), 1e-9);
    }

    #[test]
    fn test_round_trip_near_range_limit() {
        let start = Heading::from_degrees(10.0);
        assert_eq!(start.turned_right(1e28).turned_left(1e28), start);
        assert_eq!(start.turned_left(1e28).turned_right(1e28), start);
    }

    #[test]
    fn test_out_of_range_turn_saturates() {
        let start = Heading::from_degrees(10.0);
        let saturated = start.turned_right(1e30);
        assert_eq!(saturated, Heading::ZERO.turned_right(f64::INFINITY));
        // 饱和后无法还原
        assert_ne!(saturated.turned_left(1e30), start);
    }

    #[test]
    fn test_display() {
        assert_eq!(Heading::from_degrees(12.5).to_string(), "12.5°");
    }

    proptest! {
        #[test]
        fn prop_turn_round_trip_is_exact(start in -1.0e6f64..1.0e6, d in -1.0e6f64..1.0e6) {
            let heading = Heading::from_degrees(start);
            prop_assert_eq!(heading.turned_right(d).turned_left(d), heading);
            prop_assert_eq!(heading.turned_left(d).turned_right(d), heading);
        }

        #[test]
        fn prop_round_trip_across_magnitudes(
            start in -1.0e6f64..1.0e6,
            mantissa in -1.0f64..1.0,
            exponent in -12i32..28,
        ) {
            let d = mantissa * 10f64.powi(exponent);
            let heading = Heading::from_degrees(start);
            prop_assert_eq!(heading.turned_right(d).turned_left(d), heading);
            prop_assert_eq!(heading.turned_left(d).turned_right(d), heading);
        }

        #[test]
        fn prop_forward_matches_cos_sin(h in -720.0f64..720.0, m in 0.0f64..50.0) {
            let heading = Heading::from_degrees(h);
            let v = heading.horizontal_velocity(Direction::Forward, m);
            let rad = heading.radians();
            prop_assert!((v.x - m * rad.cos()).abs() < 1e-9);
            prop_assert!((v.y - m * rad.sin()).abs() < 1e-9);
        }

        #[test]
        fn prop_back_and_left_mirror(h in -720.0f64..720.0, m in 0.0f64..50.0) {
            let heading = Heading::from_degrees(h);
            let forward = heading.horizontal_velocity(Direction::Forward, m);
            let back = heading.horizontal_velocity(Direction::Back, m);
            let left = heading.horizontal_velocity(Direction::Left, m);
            let right = heading.horizontal_velocity(Direction::Right, m);
            prop_assert_eq!(back, -forward);
            prop_assert_eq!(left, -right);
        }
    }
}
