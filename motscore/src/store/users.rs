//! 评审者.

use base64::Engine;
use rusqlite::{params, Connection, OptionalExtension};

use super::Reviewer;
use crate::consts::USER_CODE_LEN;
use crate::{Error, Result};

/// 生成随机用户码: 对 32 个随机字节做 base64 编码, 取前 8 个字符.
fn random_code() -> String {
    let bytes: [u8; 32] = rand::random();
    let mut code = base64::engine::general_purpose::STANDARD.encode(bytes);
    code.truncate(USER_CODE_LEN);
    code
}

/// 注册评审者, 返回其用户码.
///
/// 若给定 `force_code` 则直接使用, 否则生成一个尚未被占用的随机用户码.
///
/// # 错误
///
/// `force_code` 为空或已被占用时返回 `Error::Validation`.
pub fn create_user(conn: &Connection, email: &str, force_code: Option<&str>) -> Result<String> {
    let code = match force_code {
        Some("") => return Err(Error::Validation("user code must not be empty".into())),
        Some(code) => {
            if find_user(conn, code)?.is_some() {
                return Err(Error::Validation(format!("user code `{code}` already exists")));
            }
            code.to_string()
        }
        None => loop {
            let code = random_code();
            if find_user(conn, &code)?.is_none() {
                break code;
            }
        },
    };

    conn.execute(
        "INSERT INTO user (user_code, email) VALUES (?1, ?2)",
        params![code, email],
    )?;
    log::info!("event=create_user module=store status=ok forced={}", force_code.is_some());
    Ok(code)
}

/// 按用户码查找评审者.
pub fn find_user(conn: &Connection, code: &str) -> Result<Option<Reviewer>> {
    let reviewer = conn
        .query_row(
            "SELECT id, user_code, email FROM user WHERE user_code = ?1",
            [code],
            Reviewer::from_row,
        )
        .optional()?;
    Ok(reviewer)
}
