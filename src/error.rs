use thiserror::Error;

/// セットアップ時の致命的エラー
///
/// フレーム単位の欠損や縮退はエラーにせず、直前の値を保持して続行する。
#[derive(Debug, Error)]
pub enum RigError {
    /// レストポーズスケルトンに必要なボーンがない
    #[error("rest skeleton has no bone named \"{0}\"")]
    MissingBone(&'static str),

    /// レストポーズでボーン方向が定義できない（子と同一位置など）
    #[error("rest pose orientation for \"{0}\" is degenerate")]
    DegenerateRestPose(&'static str),

    /// スケルトン定義そのものが不正
    #[error("invalid skeleton: {0}")]
    InvalidSkeleton(String),
}
