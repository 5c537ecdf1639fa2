mod gateway;
mod helpers;
mod host_api;
mod mocks;
