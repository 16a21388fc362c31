pub mod inventory;
pub mod network;
pub mod prober;
pub mod report;
pub mod scanner;
pub mod timing;
pub mod vendors;
