mod test_cooling;
mod test_thermal;
