// Dashboard assembly over a snapshot of sales data
pub mod analytics_service;
