//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod combo;
pub mod film;
pub mod film_version;
pub mod invoice;
pub mod invoice_combo;
pub mod invoice_voucher;
pub mod refund_request;
pub mod room;
pub mod sea_orm_active_enums;
pub mod seat;
pub mod showtime;
pub mod showtime_seat;
pub mod ticket;
pub mod transaction;
pub mod voucher;

// Re-export specific types to avoid conflicts
pub use combo::{Column as ComboColumn, Entity as Combo, Model as ComboModel};
pub use film::{Column as FilmColumn, Entity as Film, Model as FilmModel};
pub use film_version::{
    Column as FilmVersionColumn, Entity as FilmVersion, Model as FilmVersionModel,
};
pub use invoice::{Column as InvoiceColumn, Entity as Invoice, Model as InvoiceModel};
pub use invoice_combo::{
    Column as InvoiceComboColumn, Entity as InvoiceCombo, Model as InvoiceComboModel,
};
pub use invoice_voucher::{
    Column as InvoiceVoucherColumn, Entity as InvoiceVoucher, Model as InvoiceVoucherModel,
};
pub use refund_request::{
    Column as RefundRequestColumn, Entity as RefundRequest, Model as RefundRequestModel,
};
pub use room::{Column as RoomColumn, Entity as Room, Model as RoomModel};
pub use seat::{Column as SeatColumn, Entity as Seat, Model as SeatModel};
pub use showtime::{Column as ShowtimeColumn, Entity as Showtime, Model as ShowtimeModel};
pub use showtime_seat::{
    Column as ShowtimeSeatColumn, Entity as ShowtimeSeat, Model as ShowtimeSeatModel,
};
pub use ticket::{Column as TicketColumn, Entity as Ticket, Model as TicketModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use voucher::{Column as VoucherColumn, Entity as Voucher, Model as VoucherModel};
