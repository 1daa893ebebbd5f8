// ==========================================
// 预制构件模具排产系统 - 命令行入口
// ==========================================
// 用法:
//   precast-aps [--db <path>] reschedule [actor]
//   precast-aps [--db <path>] schedule
//   precast-aps [--db <path>] delay <batch_id> <minutes> [reason]
//   precast-aps [--db <path>] suggest <height_cm> <width_cm> <length_cm> <qty> <unit_minutes> [resource_id]
//   precast-aps [--db <path>] log [limit]
//
// 结果以 JSON 写到 stdout; 日志写到 stderr
// 退出码: 0 成功 / 1 业务错误 / 2 用法错误
// ==========================================

use precast_aps::api::{ApiError, ApplyDelayRequest, DEFAULT_ACTOR};
use precast_aps::app::{get_default_db_path, AppState};
use precast_aps::domain::PieceEnvelope;
use precast_aps::engine::SuggestionRequest;
use serde::Serialize;
use serde_json::json;
use std::process::ExitCode;

const USAGE: &str = "用法: precast-aps [--db <path>] <reschedule [actor] | schedule | delay <batch_id> <minutes> [reason] | suggest <h> <w> <l> <qty> <unit_minutes> [resource_id] | log [limit]>";

/// 命令行错误
enum CliError {
    Usage(String),
    Api(ApiError),
    Startup(String),
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        CliError::Api(err)
    }
}

fn main() -> ExitCode {
    precast_aps::logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let db_path = take_db_flag(&mut args).unwrap_or_else(get_default_db_path);

    tracing::info!("{} v{} 使用数据库: {}", precast_aps::APP_NAME, precast_aps::VERSION, db_path);

    match run(&db_path, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(msg)) => {
            eprintln!("{}\n{}", msg, USAGE);
            ExitCode::from(2)
        }
        Err(CliError::Startup(msg)) => {
            print_json(&json!({ "error": { "code": "STARTUP_FAILED", "message": msg } }));
            ExitCode::from(1)
        }
        Err(CliError::Api(err)) => {
            tracing::warn!(code = err.code(), "命令失败: {}", err);
            print_json(&json!({ "error": { "code": err.code(), "message": err.to_string() } }));
            ExitCode::from(1)
        }
    }
}

fn run(db_path: &str, args: &[String]) -> Result<(), CliError> {
    let (command, rest) = args
        .split_first()
        .ok_or_else(|| CliError::Usage("缺少命令".to_string()))?;

    let state = AppState::new(db_path.to_string()).map_err(CliError::Startup)?;
    let api = &state.schedule_api;

    match command.as_str() {
        "reschedule" => {
            let actor = rest.first().map(String::as_str).unwrap_or(DEFAULT_ACTOR);
            print_json(&api.reschedule(actor)?);
        }
        "schedule" => {
            print_json(&api.get_schedule()?);
        }
        "delay" => {
            let batch_id = arg(rest, 0, "batch_id")?;
            let delay_minutes: i64 = parse_arg(rest, 1, "minutes")?;
            let request = ApplyDelayRequest {
                batch_id: batch_id.to_string(),
                delay_minutes,
                reason: rest.get(2).cloned(),
            };
            print_json(&api.apply_delay(&request, DEFAULT_ACTOR)?);
        }
        "suggest" => {
            let request = SuggestionRequest {
                envelope: PieceEnvelope::new(
                    parse_arg(rest, 0, "height_cm")?,
                    parse_arg(rest, 1, "width_cm")?,
                    parse_arg(rest, 2, "length_cm")?,
                ),
                quantity: parse_arg(rest, 3, "qty")?,
                unit_time_minutes: parse_arg(rest, 4, "unit_minutes")?,
                resource_id: rest.get(5).cloned(),
            };
            print_json(&api.suggest_date(&request)?);
        }
        "log" => {
            let limit: i32 = match rest.first() {
                Some(_) => parse_arg(rest, 0, "limit")?,
                None => 20,
            };
            print_json(&api.recent_actions(limit)?);
        }
        other => return Err(CliError::Usage(format!("未知命令: {}", other))),
    }

    Ok(())
}

/// 取出 `--db <path>` 参数
fn take_db_flag(args: &mut Vec<String>) -> Option<String> {
    let pos = args.iter().position(|a| a == "--db")?;
    if pos + 1 >= args.len() {
        args.remove(pos);
        return None;
    }
    let path = args.remove(pos + 1);
    args.remove(pos);
    Some(path)
}

fn arg<'a>(rest: &'a [String], idx: usize, name: &str) -> Result<&'a str, CliError> {
    rest.get(idx)
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage(format!("缺少参数: {}", name)))
}

fn parse_arg<T: std::str::FromStr>(rest: &[String], idx: usize, name: &str) -> Result<T, CliError> {
    let raw = arg(rest, idx, name)?;
    raw.trim()
        .parse::<T>()
        .map_err(|_| CliError::Usage(format!("参数 {} 格式错误: {}", name, raw)))
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON 序列化失败: {}", e),
    }
}
