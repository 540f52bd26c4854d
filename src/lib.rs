pub mod api;
pub mod core;
pub mod glyph_decoder;

/// 初始化日志（读取 RUST_LOG，默认 info）
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
