/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - 認証済みリクエストのコンテキスト（AuthCtx）を handler に提供する
 * - 認証無効 (Disabled) と認証済み (Authenticated) を型で区別する
 * - HTTP / axum 依存は core に閉じ込め、型定義は types に分離する
 *
 * Public API:
 * - AuthCtx
 * - RequestAuth (extractor)
 */

mod core;
mod types;

pub use types::{AuthCtx, RequestAuth};
