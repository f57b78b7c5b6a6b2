/// Long running jobs that watch a value
pub mod trace;
