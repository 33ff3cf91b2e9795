pub mod amendment;
pub mod crm;
pub mod product;
pub mod status;

pub use amendment::{Actor, AmendmentEntry, AmendmentView, ChangeSet, ChangesPayload, Disposition};
pub use product::{PricingRule, ProductRef, ProductType, SubSelectors};
pub use status::{
    AmendStatus, BookingReservationStatus, ItemReservationStatus, PaymentStatus, VerifyStatus,
};
