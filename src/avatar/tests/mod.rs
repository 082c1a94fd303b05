mod concurrency;
mod helpers;
mod state_machine;
