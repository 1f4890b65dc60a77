use nalgebra::{UnitQuaternion, Vector3};

use crate::config::CameraConfig;

/// ワールド ⇔ スクリーンの射影
///
/// スクリーン座標はピクセル単位で原点左下・y上向き、z はカメラからの奥行き。
pub trait Projection {
    /// カメラの後ろにある点は None
    fn world_to_screen(&self, world: &Vector3<f32>) -> Option<Vector3<f32>>;
    fn screen_to_world(&self, screen: &Vector3<f32>) -> Vector3<f32>;
    /// (幅, 高さ) ピクセル
    fn viewport(&self) -> (f32, f32);
}

/// ピンホールカメラ（ローカル +Z 方向を見る、正方ピクセル）
#[derive(Debug, Clone)]
pub struct PinholeCamera {
    width: f32,
    height: f32,
    focal: f32,
    position: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
}

/// これより手前の点は射影しない
const NEAR_PLANE: f32 = 1e-4;

impl PinholeCamera {
    /// FOV + 位置 + 回転から構築
    ///
    /// - fov_v_deg: 垂直画角（度）
    /// - width, height: ビューポート解像度
    /// - position: カメラ位置 [x, y, z] メートル
    /// - rotation_deg: カメラ回転 [rx, ry, rz] 度 (Euler XYZ)
    pub fn new(
        fov_v_deg: f32,
        width: u32,
        height: u32,
        position: [f32; 3],
        rotation_deg: [f32; 3],
    ) -> Self {
        let w = width as f32;
        let h = height as f32;
        let focal = h / (2.0 * (fov_v_deg.to_radians() / 2.0).tan());

        let rotation = UnitQuaternion::from_euler_angles(
            rotation_deg[0].to_radians(),
            rotation_deg[1].to_radians(),
            rotation_deg[2].to_radians(),
        );

        Self {
            width: w,
            height: h,
            focal,
            position: Vector3::from(position),
            rotation,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            config.fov_v_deg,
            config.width,
            config.height,
            config.position,
            config.rotation_deg,
        )
    }

    fn principal_point(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Projection for PinholeCamera {
    fn world_to_screen(&self, world: &Vector3<f32>) -> Option<Vector3<f32>> {
        let local = self.rotation.inverse_transform_vector(&(world - self.position));
        if local.z < NEAR_PLANE {
            return None;
        }
        let (cx, cy) = self.principal_point();
        Some(Vector3::new(
            cx + self.focal * local.x / local.z,
            cy + self.focal * local.y / local.z,
            local.z,
        ))
    }

    fn screen_to_world(&self, screen: &Vector3<f32>) -> Vector3<f32> {
        let (cx, cy) = self.principal_point();
        let depth = screen.z;
        let local = Vector3::new(
            (screen.x - cx) * depth / self.focal,
            (screen.y - cy) * depth / self.focal,
            depth,
        );
        self.rotation * local + self.position
    }

    fn viewport(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}
