mod socket;

pub use socket::{BufferedSocket, Socket, WriteBuffer};
