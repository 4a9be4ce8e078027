mod test_smoothing;


#[cfg(feature = "support_analysis")]
mod test_balance_flow;
