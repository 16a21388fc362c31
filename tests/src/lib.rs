#[cfg(test)]
mod discovery;
#[cfg(test)]
mod inventory;
#[cfg(test)]
mod utils;
