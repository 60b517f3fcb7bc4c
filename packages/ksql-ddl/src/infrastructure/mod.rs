pub mod ksql;
