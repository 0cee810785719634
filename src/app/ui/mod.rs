mod details;
mod histogram;
mod panels;
