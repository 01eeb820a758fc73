pub mod city;
pub mod sms_message;
pub mod technician;
pub mod template;
