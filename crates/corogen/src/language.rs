pub const LANG_ID: &str = "corogen-stmt@0.1.0";

pub const AST_SCHEMA_VERSION: &str = "corogen.ast@0.1.0";
pub const REPORT_SCHEMA_VERSION: &str = "corogen.report@0.1.0";

pub mod limits {
    pub const MAX_SOURCE_BYTES: usize = 4 * 1024 * 1024;
    pub const MAX_BODY_DEPTH: u32 = 255;
    pub const MAX_EXPR_DEPTH: u32 = 255;
    pub const MAX_TEMPS: u32 = 10_000;
    pub const MAX_IO_BINDS: u32 = 100;
    /// Reserved sentinel: a suspension point id may never reach this value.
    pub const MAX_CORO_SUSP_POINT: u32 = u32::MAX;
    pub const MAX_JUMP_TARGETS: u32 = 1_000_000;
    pub const MAX_C_BYTES: usize = 32 * 1024 * 1024;

    fn env_u32(key: &str, default: u32) -> u32 {
        match std::env::var(key) {
            Ok(v) => v
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .unwrap_or(default),
            Err(_) => default,
        }
    }

    pub fn max_source_bytes() -> usize {
        match std::env::var("COROGEN_MAX_SOURCE_BYTES") {
            Ok(v) => v
                .parse::<usize>()
                .ok()
                .filter(|v| *v > 0)
                .unwrap_or(MAX_SOURCE_BYTES),
            Err(_) => MAX_SOURCE_BYTES,
        }
    }

    pub fn max_c_bytes() -> usize {
        match std::env::var("COROGEN_MAX_C_BYTES") {
            Ok(v) => v
                .parse::<usize>()
                .ok()
                .filter(|v| *v > 0)
                .unwrap_or(MAX_C_BYTES),
            Err(_) => MAX_C_BYTES,
        }
    }

    pub fn max_body_depth() -> u32 {
        env_u32("COROGEN_MAX_BODY_DEPTH", MAX_BODY_DEPTH)
    }

    pub fn max_expr_depth() -> u32 {
        env_u32("COROGEN_MAX_EXPR_DEPTH", MAX_EXPR_DEPTH)
    }

    pub fn max_temps() -> u32 {
        env_u32("COROGEN_MAX_TEMPS", MAX_TEMPS)
    }

    pub fn max_io_binds() -> u32 {
        env_u32("COROGEN_MAX_IO_BINDS", MAX_IO_BINDS)
    }

    pub fn max_coro_susp_point() -> u32 {
        env_u32("COROGEN_MAX_CORO_SUSP_POINT", MAX_CORO_SUSP_POINT)
    }

    pub fn max_jump_targets() -> u32 {
        env_u32("COROGEN_MAX_JUMP_TARGETS", MAX_JUMP_TARGETS)
    }
}

/// Resource ceilings for one generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenLimits {
    pub max_body_depth: u32,
    pub max_expr_depth: u32,
    pub max_temps: u32,
    pub max_io_binds: u32,
    pub max_coro_susp_point: u32,
    pub max_jump_targets: u32,
    /// Ceiling on the generated C for one function, in bytes.
    pub max_c_bytes: usize,
}

impl GenLimits {
    pub fn from_env() -> Self {
        Self {
            max_body_depth: limits::max_body_depth(),
            max_expr_depth: limits::max_expr_depth(),
            max_temps: limits::max_temps(),
            max_io_binds: limits::max_io_binds(),
            max_coro_susp_point: limits::max_coro_susp_point(),
            max_jump_targets: limits::max_jump_targets(),
            max_c_bytes: limits::max_c_bytes(),
        }
    }
}

impl Default for GenLimits {
    fn default() -> Self {
        Self {
            max_body_depth: limits::MAX_BODY_DEPTH,
            max_expr_depth: limits::MAX_EXPR_DEPTH,
            max_temps: limits::MAX_TEMPS,
            max_io_binds: limits::MAX_IO_BINDS,
            max_coro_susp_point: limits::MAX_CORO_SUSP_POINT,
            max_jump_targets: limits::MAX_JUMP_TARGETS,
            max_c_bytes: limits::MAX_C_BYTES,
        }
    }
}
