pub mod fastblur;
