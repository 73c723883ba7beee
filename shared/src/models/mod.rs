//! Domain models owned by the table engine

pub mod dining_table;
pub mod order_status;
pub mod reservation;
pub mod table_session;

pub use dining_table::{DiningTable, DiningTableCreate};
pub use order_status::{OrderStatus, OrderStatusRecord, PaymentStatus};
pub use reservation::{Reservation, ReservationStatus};
pub use table_session::{SessionStatus, TableSession};
