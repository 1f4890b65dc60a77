//! 座標系変換
//!
//! - 推定器スクリーン座標: 正規化 (0〜1), 原点左上, y下向き
//! - スクリーン座標: ピクセル, 原点左下, y上向き, zは奥行き
//! - 推定器ワールド座標: メートル, 腰中心, y下向き
//! - アバター座標: メートル, y上向き
//!
//! y反転はすべてここで行う。他のモジュールで符号を反転しないこと。

use nalgebra::Vector3;

/// 推定器の正規化スクリーン座標 → ピクセルスクリーン座標
pub fn normalized_to_screen(p: Vector3<f32>, viewport: (f32, f32)) -> Vector3<f32> {
    let (width, height) = viewport;
    Vector3::new(width * p.x, height - height * p.y, p.z)
}

/// ピクセルスクリーン座標 → 推定器の正規化スクリーン座標
pub fn screen_to_normalized(p: Vector3<f32>, viewport: (f32, f32)) -> Vector3<f32> {
    let (width, height) = viewport;
    Vector3::new(p.x / width, (height - p.y) / height, p.z)
}

/// 推定器ワールド座標 (y下向き) → アバター座標 (y上向き)
pub fn estimator_world_to_avatar(p: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(p.x, -p.y, p.z)
}

/// アバター座標 → 推定器ワールド座標
pub fn avatar_to_estimator_world(p: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(p.x, -p.y, p.z)
}
