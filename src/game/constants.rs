pub const BOARD_WIDTH: i32 = 40;
pub const BOARD_HEIGHT: i32 = 30;
pub const TICK_MS: u64 = 200;
pub const INITIAL_LENGTH: usize = 5;
pub const FOOD_COUNT: usize = 1;
pub const OBSTACLE_COUNT: usize = 4;
pub const MAX_PLAYERS: usize = 8;
pub const MAX_SPAWN_ATTEMPTS: usize = 256;
pub const SPAWN_MARGIN_X: i32 = 2;
pub const MAX_BOARD_SIDE: i32 = 512;
pub const MAX_INITIAL_LENGTH: usize = 256;
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;
